//! Settings parser for .espterm/config.toml
//!
//! Everything here is optional: without a config file the bridge runs at
//! 115200 baud with dump capture off. Command-line flags override whatever
//! the file says.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use espterm_core::prelude::*;
use espterm_device::BaudRate;

use crate::session::CaptureOptions;
use crate::sink::DEFAULT_DUMP_FILE;

const CONFIG_FILENAME: &str = "config.toml";
const ESPTERM_DIR: &str = ".espterm";

/// Global settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub serial: SerialSettings,
    pub dump: DumpSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Line speed in bits per second; must be one of the supported rates
    pub baud_rate: u32,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: BaudRate::default().as_u32(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DumpSettings {
    /// Capture exception dumps between markers
    pub enabled: bool,
    /// Dump log path, relative to the working directory
    pub file: PathBuf,
}

impl Default for DumpSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            file: PathBuf::from(DEFAULT_DUMP_FILE),
        }
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub baud_rate: Option<u32>,
    pub dump_enabled: bool,
    pub dump_file: Option<PathBuf>,
}

impl Settings {
    /// Apply command-line overrides
    pub fn merge(mut self, overrides: &Overrides) -> Self {
        if let Some(baud) = overrides.baud_rate {
            self.serial.baud_rate = baud;
        }
        if overrides.dump_enabled {
            self.dump.enabled = true;
        }
        if let Some(file) = &overrides.dump_file {
            self.dump.file = file.clone();
        }
        self
    }

    /// Validated data rate
    pub fn baud_rate(&self) -> Result<BaudRate> {
        BaudRate::try_from(self.serial.baud_rate)
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            enabled: self.dump.enabled,
            dump_file: self.dump.file.clone(),
        }
    }
}

/// Load settings from `.espterm/config.toml` under `dir`.
///
/// A missing file yields defaults; an unreadable or malformed file is logged
/// and also yields defaults.
pub fn load_settings(dir: &Path) -> Settings {
    let config_path = dir.join(ESPTERM_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) {
        let espterm_dir = dir.path().join(ESPTERM_DIR);
        fs::create_dir_all(&espterm_dir).unwrap();
        fs::write(espterm_dir.join(CONFIG_FILENAME), content).unwrap();
    }

    #[test]
    fn test_defaults_without_config_file() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings(dir.path());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.serial.baud_rate, 115200);
        assert!(!settings.dump.enabled);
        assert_eq!(settings.dump.file, PathBuf::from("dump.log"));
    }

    #[test]
    fn test_load_full_config() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"
[serial]
baud_rate = 74880

[dump]
enabled = true
file = "crash.log"
"#,
        );

        let settings = load_settings(dir.path());
        assert_eq!(settings.serial.baud_rate, 74880);
        assert!(settings.dump.enabled);
        assert_eq!(settings.dump.file, PathBuf::from("crash.log"));
        // Parsed fine, rejected only when validated
        assert!(matches!(
            settings.baud_rate(),
            Err(Error::UnsupportedBaudRate { baud: 74880 })
        ));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[dump]\nenabled = true\n");

        let settings = load_settings(dir.path());
        assert_eq!(settings.serial.baud_rate, 115200);
        assert!(settings.dump.enabled);
        assert_eq!(settings.dump.file, PathBuf::from("dump.log"));
    }

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[serial\nbaud_rate = fast");
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let settings = Settings::default().merge(&Overrides {
            baud_rate: Some(9600),
            dump_enabled: true,
            dump_file: Some(PathBuf::from("/tmp/x.log")),
        });
        assert_eq!(settings.baud_rate().unwrap(), BaudRate::B9600);
        let options = settings.capture_options();
        assert!(options.enabled);
        assert_eq!(options.dump_file, PathBuf::from("/tmp/x.log"));
    }

    #[test]
    fn test_empty_overrides_keep_file_values() {
        let mut base = Settings::default();
        base.dump.enabled = true;
        base.serial.baud_rate = 57600;
        let merged = base.clone().merge(&Overrides::default());
        assert_eq!(merged, base);
    }
}
