//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive; values are kept verbatim.

use crate::domain::error::BacktestError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BacktestError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| BacktestError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, BacktestError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| BacktestError::ConfigParse {
                file: "<inline>".into(),
                reason,
            })?;
        Ok(Self { ini })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let map = self.ini.get_map_ref();
        let mut keys: Vec<String> = match map.get(&section.to_lowercase()) {
            Some(entries) => entries.keys().cloned().collect(),
            None => Vec::new(),
        };
        keys.sort();
        keys
    }
}
