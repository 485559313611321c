use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use elevate_core::{PersistedSettings, Result, SessionConfig, SettingsProvider};

/// Session defaults kept as flat JSON keys in a file between runs.
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsProvider for JsonFileSettings {
    /// A missing file yields the built-in defaults.
    fn get_defaults(&self) -> Result<SessionConfig> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = ?self.path, "no stored settings, using defaults");
                return Ok(SessionConfig::default());
            }
            Err(err) => return Err(err.into()),
        };
        let persisted: PersistedSettings = serde_json::from_str(&text)?;
        SessionConfig::from_persisted(&persisted)
    }

    fn set_defaults(&mut self, config: &SessionConfig) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(&config.to_persisted())?;
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json)?;
        tracing::info!(path = ?self.path, "session defaults saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("elevate-settings-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn missing_file_gives_defaults() {
        let settings = JsonFileSettings::new(scratch_path("absent.json"));
        assert_eq!(settings.get_defaults().unwrap(), SessionConfig::default());
    }

    #[test]
    fn saved_defaults_are_read_back() {
        let path = scratch_path("saved.json");
        let mut settings = JsonFileSettings::new(&path);
        let mut config = SessionConfig::default().with_stimuli_type(2);
        config.audio.base_frequency = 320.0;
        config.enable_visual_stimuli = true;
        config.timeline = config.timeline.with_durations([5.0, 3.0, 6.0, 2.0]).unwrap();
        settings.set_defaults(&config).unwrap();

        let loaded = settings.get_defaults().unwrap();
        assert_eq!(loaded.to_persisted(), config.to_persisted());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn invalid_config_is_not_written() {
        let path = scratch_path("invalid.json");
        let mut settings = JsonFileSettings::new(&path);
        let mut config = SessionConfig::default();
        config.audio.base_frequency = 5.0;
        assert!(settings.set_defaults(&config).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_is_a_configuration_error() {
        let path = scratch_path("corrupt.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileSettings::new(&path).get_defaults().unwrap_err();
        assert!(err.is_configuration());
        let _ = fs::remove_file(path);
    }
}
