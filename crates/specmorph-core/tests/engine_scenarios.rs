//! End-to-end behaviour of the spectral engine through its public API

use std::sync::Arc;

use parking_lot::Mutex;

use specmorph_core::config::EngineConfig;
use specmorph_core::observe::EngineObserver;
use specmorph_core::spectral::FrameStats;
use specmorph_core::state::{from_json, to_json};
use specmorph_core::units;
use specmorph_core::{create_engine, Channel, CurveKind, EngineController, SpectralEngine, StereoBuffer, StereoSample};

const SR: f32 = 48000.0;
const BLOCK: usize = 512;

/// Run `input` through the engine in fixed blocks
fn render(engine: &mut SpectralEngine, input: &[StereoSample]) -> Vec<StereoSample> {
    let mut output = Vec::with_capacity(input.len());
    for chunk in input.chunks(BLOCK) {
        let mut block = StereoBuffer::from_vec(chunk.to_vec());
        engine.process(&mut block);
        output.extend_from_slice(block.as_slice());
    }
    output
}

fn default_engine() -> (SpectralEngine, EngineController) {
    create_engine(EngineConfig::default()).unwrap()
}

/// Silence with a unit impulse on the chosen channels at `at`
fn impulse(len: usize, at: usize, left: bool, right: bool) -> Vec<StereoSample> {
    let mut buf = vec![StereoSample::silence(); len];
    buf[at] = StereoSample::new(if left { 1.0 } else { 0.0 }, if right { 1.0 } else { 0.0 });
    buf
}

/// Index and absolute value of the largest sample of one channel in `range`
fn peak_in(buf: &[StereoSample], range: std::ops::Range<usize>, ch: Channel) -> (usize, f32) {
    buf[range.clone()]
        .iter()
        .map(|s| s.channel(ch).abs())
        .enumerate()
        .fold((range.start, 0.0), |(bi, bv), (i, v)| {
            if v > bv {
                (range.start + i, v)
            } else {
                (bi, bv)
            }
        })
}

// ============================================================================
// Pass-through
// ============================================================================

#[test]
fn test_silence_in_silence_out() {
    let (mut engine, _ctl) = default_engine();
    let output = render(&mut engine, &vec![StereoSample::silence(); 48000]);
    assert!(output.iter().all(|s| s.left == 0.0 && s.right == 0.0));
    assert!(engine.frames_processed() > 80);
}

#[test]
fn test_identity_reproduces_input_after_latency() {
    let (mut engine, _ctl) = default_engine();
    let n = 48000;
    let input: Vec<StereoSample> = (0..n)
        .map(|i| {
            let t = i as f32 / SR;
            StereoSample::new(
                0.4 * (2.0 * std::f32::consts::PI * 220.0 * t).sin(),
                0.3 * (2.0 * std::f32::consts::PI * 3150.0 * t).sin(),
            )
        })
        .collect();
    let output = render(&mut engine, &input);
    let latency = engine.latency_samples();
    assert_eq!(latency, 2048);

    for i in (latency * 2)..n {
        let expected = input[i - latency];
        assert!((output[i].left - expected.left).abs() < 1e-3, "L at {}", i);
        assert!((output[i].right - expected.right).abs() < 1e-3, "R at {}", i);
    }
}

/// Deterministic broadband test signal
fn noise(len: usize, seed: u32) -> Vec<StereoSample> {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
    };
    (0..len)
        .map(|_| {
            let l = next() * 0.6;
            let r = next() * 0.6;
            StereoSample::new(l, r)
        })
        .collect()
}

#[test]
fn test_fast_paths_do_not_change_output() {
    let render_with = |fast_paths: bool| {
        let config = EngineConfig {
            fast_paths,
            ..Default::default()
        };
        let (mut engine, mut ctl) = create_engine(config).unwrap();
        // Only delay and pan are active; dynamics, feedback and shift stay inert
        ctl.set_delay_max_ms(0, Channel::Left, 200.0).unwrap();
        ctl.edit_curve(0, CurveKind::DelayL, |c| c.add_point(0.5, 0.6)).unwrap();
        ctl.edit_curve(0, CurveKind::PanR, |c| c.reset(0.3)).unwrap();
        let output = render(&mut engine, &noise(24000, 7));
        (output, engine.frames_processed())
    };

    let (fast, frames) = render_with(true);
    let (full, _) = render_with(false);
    assert!(frames > 0);
    for (i, (a, b)) in fast.iter().zip(full.iter()).enumerate() {
        assert!((a.left - b.left).abs() < 1e-5, "L differs at {}", i);
        assert!((a.right - b.right).abs() < 1e-5, "R differs at {}", i);
    }
}

// ============================================================================
// Delay and feedback
// ============================================================================

#[test]
fn test_left_delay_at_full_range() {
    let (mut engine, mut ctl) = default_engine();
    ctl.set_delay_max_ms(0, Channel::Left, 500.0).unwrap();
    ctl.edit_curve(0, CurveKind::DelayL, |c| c.reset(1.0)).unwrap();

    let t0 = 4800;
    let len = t0 + 2048 + 24000 + 4096;
    let output = render(&mut engine, &impulse(len, t0, true, true));

    let latency = engine.latency_samples();
    let hop = engine.config().hop_size();
    let nominal = t0 + latency + 24000;

    // Right is undelayed
    let (r_at, r_peak) = peak_in(&output, (t0 + latency - hop)..(t0 + latency + hop), Channel::Right);
    assert_eq!(r_at, t0 + latency);
    assert!(r_peak > 0.9, "right impulse {}", r_peak);

    // Left is silent where the undelayed impulse would be
    let (_, early) = peak_in(&output, (t0 + latency - hop)..(t0 + latency + hop), Channel::Left);
    assert!(early < 1e-3, "left leaked undelayed: {}", early);

    // Left reappears ~500 ms later, within one hop
    let (l_at, l_peak) = peak_in(&output, (nominal - 2 * hop)..(nominal + 2 * hop), Channel::Left);
    assert!(l_peak > 0.9, "delayed impulse {}", l_peak);
    assert!(l_at.abs_diff(nominal) < hop, "arrived at {}, expected ~{}", l_at, nominal);
}

#[test]
fn test_feedback_repeats_decay() {
    let (mut engine, mut ctl) = default_engine();
    let hop = engine.config().hop_size();
    ctl.set_delay_max_ms(0, Channel::Left, 100.0).unwrap();
    ctl.edit_curve(0, CurveKind::DelayL, |c| c.reset(1.0)).unwrap();
    let fb_y = units::feedback_db_to_normalized(20.0 * 0.5f32.log10());
    ctl.edit_curve(0, CurveKind::FeedbackL, |c| c.reset(fb_y)).unwrap();

    // 100 ms = 4800 samples = 9 whole hops
    let d = 4800 / hop;
    let t0 = 4800;
    let latency = engine.latency_samples();
    let len = t0 + latency + (3 * d + 4) * hop;
    let output = render(&mut engine, &impulse(len, t0, true, false));

    let first = t0 + latency + d * hop;
    let (_, p1) = peak_in(&output, (first - hop / 2)..(first + hop / 2), Channel::Left);
    assert!((p1 - 1.0).abs() < 0.1, "first echo {}", p1);

    // The fed-back copy re-enters one frame later and is delayed again
    let second = t0 + latency + (2 * d + 1) * hop;
    let (_, p2) = peak_in(&output, (second - hop / 2)..(second + hop / 2), Channel::Left);
    assert!(p2 > 0.35 && p2 < 0.65, "second echo {}", p2);

    assert!(output.iter().all(|s| s.left.is_finite() && s.right.is_finite()));
}

#[test]
fn test_delay_capacity_grows_and_engine_adopts_it() {
    let (mut engine, mut ctl) = default_engine();
    let before = engine.delay_capacity();
    assert_eq!(ctl.shared().delay_capacity_frames(), before);

    ctl.set_delay_max_ms(1, Channel::Right, 4000.0).unwrap();
    let expected = units::delay_capacity_frames(4000.0, SR, engine.config().hop_size());
    assert!(expected > before);
    assert_eq!(ctl.shared().delay_capacity_frames(), expected);
    assert_eq!(engine.delay_capacity(), before, "swap waits for a block boundary");

    render(&mut engine, &vec![StereoSample::silence(); 64]);
    assert_eq!(engine.delay_capacity(), expected);

    ctl.set_delay_max_ms(1, Channel::Right, 10.0).unwrap();
    render(&mut engine, &vec![StereoSample::silence(); 64]);
    assert_eq!(engine.delay_capacity(), expected, "capacity never shrinks");
}

// ============================================================================
// Morphing
// ============================================================================

#[test]
fn test_morph_to_crossfeed_bank_swaps_channels() {
    let (mut engine, ctl) = default_engine();
    for kind in [CurveKind::PanL, CurveKind::PanR] {
        ctl.edit_curve(1, kind, |c| c.reset(1.0)).unwrap();
    }
    ctl.set_morph(1.0, 0.0);

    let t0 = 4800;
    let latency = engine.latency_samples();
    let output = render(&mut engine, &impulse(t0 + latency + 2048, t0, true, false));

    let at = t0 + latency;
    assert!(output[at].left.abs() < 1e-3);
    assert!(output[at].right > 0.9, "crossfed impulse {}", output[at].right);
}

#[test]
fn test_morph_blends_bank_gain() {
    let (mut engine, mut ctl) = default_engine();
    ctl.set_bank_gain_db(2, -12.0).unwrap();
    ctl.set_morph(0.0, 0.5);

    let input = vec![StereoSample::new(0.5, 0.5); 48000];
    let output = render(&mut engine, &input);
    let expected = 0.5 * units::db_to_linear(-6.0);
    let s = output[40000];
    assert!((s.left - expected).abs() < 1e-3, "{} vs {}", s.left, expected);
}

/// Records the shift/multiply order each frame used
struct OrderRecorder(Arc<Mutex<Vec<bool>>>);

impl EngineObserver for OrderRecorder {
    fn on_frame(&mut self, _index: u64, stats: &FrameStats) {
        self.0.lock().push(stats.shift_before_multiply);
    }
}

#[test]
fn test_shift_order_needs_weight_majority() {
    let (mut engine, mut ctl) = default_engine();
    for bank in 1..4 {
        ctl.set_shift_before_multiply(bank, false).unwrap();
    }
    let orders = Arc::new(Mutex::new(Vec::new()));
    engine.set_observer(Box::new(OrderRecorder(Arc::clone(&orders))));

    // Bank A alone: shift first
    render(&mut engine, &vec![StereoSample::silence(); 2048]);
    assert!(orders.lock().iter().all(|&shift_first| shift_first));

    // A is still the heaviest bank at (0.4, 0.4) but holds only 0.36
    orders.lock().clear();
    ctl.set_morph(0.4, 0.4);
    render(&mut engine, &vec![StereoSample::silence(); 2048]);
    let orders = orders.lock();
    assert!(!orders.is_empty());
    assert!(orders.iter().all(|&shift_first| !shift_first));
}

// ============================================================================
// Spectrograph and state
// ============================================================================

#[test]
fn test_spectrograph_tracks_sine() {
    let config = EngineConfig {
        spectrograph: true,
        ..Default::default()
    };
    let (mut engine, ctl) = create_engine(config).unwrap();
    // Bin 64 of a 2048-point FFT at 48 kHz
    let freq = 64.0 * SR / 2048.0;
    let input: Vec<StereoSample> = (0..8192)
        .map(|i| {
            let v = 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / SR).sin();
            StereoSample::new(v, 0.0)
        })
        .collect();
    render(&mut engine, &input);

    let snap = ctl.spectrograph_snapshot();
    assert!(snap.sequence > 0);
    assert_eq!(snap.num_bins, 1024);
    let loudest = snap.magnitudes_db[0][..snap.num_bins]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i);
    assert_eq!(loudest, Some(64));
    assert!(snap.magnitudes_db[1][..snap.num_bins].iter().all(|&db| db == -60.0));
}

#[test]
fn test_state_round_trip_through_json() {
    let (_engine, mut ctl) = default_engine();
    ctl.add_point_physical(0, CurveKind::DelayL, 1000.0, 250.0).unwrap();
    ctl.add_point_physical(1, CurveKind::FeedbackR, 440.0, -12.0).unwrap();
    ctl.add_point_physical(2, CurveKind::ShiftL, 2000.0, 150.0).unwrap();
    ctl.add_point_physical(3, CurveKind::MultiplyR, 500.0, 2.0).unwrap();
    ctl.set_delay_log_scale(3, Channel::Left, true).unwrap();
    ctl.set_shift_before_multiply(2, false).unwrap();
    ctl.set_bank_soft_clip_db(1, -6.0).unwrap();
    ctl.set_morph(0.25, 0.75);
    ctl.set_master_clip_db(-3.0);
    ctl.view_mut().notes_text = "four banks".to_string();

    let saved = ctl.snapshot_state();
    let json = to_json(&saved).unwrap();
    assert!(json.contains("\"masterDryWet\""));
    assert!(json.contains("\"shiftBeforeMultiply\""));

    let (_engine2, mut restored) = default_engine();
    restored.load_state(&from_json(&json).unwrap()).unwrap();
    assert_eq!(restored.snapshot_state(), saved);
}

#[test]
fn test_refused_point_leaves_curve_untouched() {
    let (_engine, ctl) = default_engine();
    let version = ctl
        .with_bank(0, |b| b.curve(CurveKind::PreGainL).version())
        .unwrap();
    assert!(ctl.add_point_physical(0, CurveKind::PreGainL, 100.0, 60.0).is_err());
    assert!(ctl.add_point_physical(0, CurveKind::PreGainL, 25000.0, 0.0).is_err());
    let after = ctl
        .with_bank(0, |b| b.curve(CurveKind::PreGainL).version())
        .unwrap();
    assert_eq!(version, after);
}
