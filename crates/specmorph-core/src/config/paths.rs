//! Standard locations for configuration and presets

use std::path::PathBuf;

/// Root folder for specmorph files
///
/// Returns: `~/.config/specmorph` (or the platform equivalent)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("specmorph")
}

/// Default engine config file: `<config dir>/engine.yaml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("engine.yaml")
}

/// Default preset folder: `<config dir>/presets`
pub fn default_preset_dir() -> PathBuf {
    default_config_dir().join("presets")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_ends_with_filename() {
        assert!(default_config_path().ends_with("specmorph/engine.yaml"));
    }

    #[test]
    fn test_preset_dir_under_config_dir() {
        assert!(default_preset_dir().starts_with(default_config_dir()));
    }
}
