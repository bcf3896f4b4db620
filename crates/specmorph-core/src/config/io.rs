//! Engine configuration files
//!
//! `engine.yaml` holds one [`EngineConfig`]. Loading never fails: a missing,
//! unreadable, unparseable or out-of-range file falls back to the defaults
//! with a warning, so a bad file can't keep the engine from starting.

use std::path::Path;

use anyhow::{Context, Result};

use super::EngineConfig;

/// Read and validate a config file; `Ok(None)` when there is no file
fn read_config(path: &Path) -> Result<Option<EngineConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let config: EngineConfig =
        serde_yaml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))?;
    config
        .validate()
        .with_context(|| format!("Unusable engine settings in {:?}", path))?;
    Ok(Some(config))
}

/// Load the engine configuration, falling back to defaults
///
/// ```ignore
/// let config = load_config(&default_config_path());
/// let (engine, controller) = create_engine(config)?;
/// ```
pub fn load_config(path: &Path) -> EngineConfig {
    match read_config(path) {
        Ok(Some(config)) => {
            log::info!(
                "Engine config from {:?}: FFT {}, overlap {}, {} Hz",
                path,
                config.fft_size,
                config.overlap_factor,
                config.sample_rate
            );
            config
        }
        Ok(None) => {
            log::info!("No engine config at {:?}, using defaults", path);
            EngineConfig::default()
        }
        Err(e) => {
            log::warn!("{:#}; using default engine config", e);
            EngineConfig::default()
        }
    }
}

/// Write the engine configuration, creating parent directories
///
/// Settings that would be rejected on load are refused here too.
pub fn save_config(config: &EngineConfig, path: &Path) -> Result<()> {
    config.validate().context("Refusing to save unusable engine settings")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {:?}", parent))?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize engine config")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write {:?}", path))?;

    log::info!("Saved engine config to {:?}", path);
    Ok(())
}
