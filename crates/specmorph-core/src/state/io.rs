//! State documents as JSON text and preset files

use std::path::{Path, PathBuf};

use super::EngineState;
use crate::error::StateResult;

/// File extension of preset files
pub const PRESET_EXTENSION: &str = "spectral";

/// Serialize a state document as pretty-printed JSON
pub fn to_json(state: &EngineState) -> StateResult<String> {
    Ok(serde_json::to_string_pretty(state)?)
}

/// Parse a state document
///
/// Fails only when the text is not JSON or the root is not an object.
/// Individual fields that do not parse are dropped.
pub fn from_json(text: &str) -> StateResult<EngineState> {
    Ok(serde_json::from_str(text)?)
}

/// `<dir>/<name>.spectral`
pub fn preset_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name).with_extension(PRESET_EXTENSION)
}

/// Write a preset file, creating parent directories
pub fn save_preset(state: &EngineState, path: &Path) -> StateResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_json(state)?)?;
    log::info!("save_preset: Saved {:?}", path);
    Ok(())
}

/// Read a preset file
pub fn load_preset(path: &Path) -> StateResult<EngineState> {
    let text = std::fs::read_to_string(path)?;
    let state = from_json(&text)?;
    log::info!("load_preset: Loaded {:?}", path);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;
    use crate::state::STATE_VERSION;

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(from_json("{ not json"), Err(StateError::Parse(_))));
        assert!(matches!(from_json("[1, 2, 3]"), Err(StateError::Parse(_))));
    }

    #[test]
    fn test_partial_document_loads() {
        let state = from_json(r#"{ "morphX": 0.75, "masterGainDB": "oops", "banks": 3 }"#).unwrap();
        assert_eq!(state.morph_x, Some(0.75));
        assert_eq!(state.master_gain_db, None);
        assert!(state.bank_states().is_empty());
    }

    #[test]
    fn test_preset_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = preset_path(&dir.path().join("presets"), "wide");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("spectral"));

        let state = EngineState {
            version: Some(STATE_VERSION.to_string()),
            morph_y: Some(0.5),
            notes_text: Some("tape echo".to_string()),
            ..Default::default()
        };
        save_preset(&state, &path).unwrap();
        assert_eq!(load_preset(&path).unwrap(), state);
    }

    #[test]
    fn test_missing_preset_is_io_error() {
        let err = load_preset(Path::new("/nonexistent/preset.spectral"));
        assert!(matches!(err, Err(StateError::Io(_))));
    }
}
