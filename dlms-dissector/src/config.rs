//! Dissector configuration
//!
//! ```toml
//! verify_check_sequences = true
//! auto_evict = true
//!
//! [reassembly]
//! max_message_size = 65536
//! max_idle_frames = 1000
//! shards = 16
//! ```
//!
//! Every key is optional.

use dlms_core::{DlmsError, DlmsResult, ReassemblyConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DissectorConfig {
    pub reassembly: ReassemblyConfig,
    /// Annotate HCS/FCS mismatches; the fields are shown either way
    pub verify_check_sequences: bool,
    /// Evict idle reassembly streams at the start of every dissection
    pub auto_evict: bool,
}

impl Default for DissectorConfig {
    fn default() -> Self {
        Self {
            reassembly: ReassemblyConfig::default(),
            verify_check_sequences: true,
            auto_evict: true,
        }
    }
}

impl DissectorConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> DlmsResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DlmsError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> DlmsResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DlmsError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> DlmsResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DlmsError::Config(format!("Failed to serialize config: {}", e)))
    }

    pub fn validate(&self) -> DlmsResult<()> {
        if self.reassembly.max_message_size == 0 {
            return Err(DlmsError::Config(
                "reassembly.max_message_size must be greater than 0".to_string(),
            ));
        }
        if self.reassembly.shards == 0 {
            return Err(DlmsError::Config(
                "reassembly.shards must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = DissectorConfig::from_toml_str("").unwrap();
        assert_eq!(config, DissectorConfig::default());
        assert_eq!(config.reassembly.max_message_size, 64 * 1024);
        assert_eq!(config.reassembly.max_idle_frames, 1000);
        assert_eq!(config.reassembly.shards, 16);
        assert!(config.verify_check_sequences);
        assert!(config.auto_evict);
    }

    #[test]
    fn test_partial_document() {
        let config = DissectorConfig::from_toml_str(
            "verify_check_sequences = false\n[reassembly]\nmax_idle_frames = 50\n",
        )
        .unwrap();
        assert!(!config.verify_check_sequences);
        assert!(config.auto_evict);
        assert_eq!(config.reassembly.max_idle_frames, 50);
        assert_eq!(config.reassembly.shards, 16);
    }

    #[test]
    fn test_validation() {
        let err = DissectorConfig::from_toml_str("[reassembly]\nshards = 0\n").unwrap_err();
        assert!(matches!(err, DlmsError::Config(_)));
        let err = DissectorConfig::from_toml_str("[reassembly]\nmax_message_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_message_size"));
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(
            DissectorConfig::from_toml_str("auto_evict = maybe"),
            Err(DlmsError::Config(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = DissectorConfig::default();
        config.reassembly.max_message_size = 4096;
        config.auto_evict = false;
        let text = config.to_toml_string().unwrap();
        assert_eq!(DissectorConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = DissectorConfig::from_file("/nonexistent/dlms.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dlms.toml"));
    }
}
