//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;
pub use validation::TableFilter;

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML (used by `init`).
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration, stamped into the script header.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_yaml_defaults() {
        let config = Config::from_yaml("source:\n  snapshot: db.json\n").unwrap();
        assert_eq!(config.translation.batch_size, 1000);
        assert!(config.translation.include_data);
        assert_eq!(config.translation.data_format, DataFormat::Insert);
        assert_eq!(config.translation.max_batch_warnings, 5);
        assert_eq!(config.translation.get_insert_chunk_size(), 250);
        assert_eq!(config.source.display_label(), "db.json");
    }

    #[test]
    fn test_from_yaml_copy_format() {
        let yaml = "translation:\n  data_format: copy\n  batch_size: 4000\n  wrap_transactions: true\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.translation.data_format, DataFormat::Copy);
        assert!(config.translation.wrap_transactions);
        assert_eq!(config.translation.get_insert_chunk_size(), 500);
    }

    #[test]
    fn test_insert_chunk_size_never_zero() {
        let mut config = Config::default();
        config.translation.batch_size = 2;
        assert_eq!(config.translation.get_insert_chunk_size(), 1);
    }

    #[test]
    fn test_invalid_data_format_rejected() {
        assert!(Config::from_yaml("translation:\n  data_format: binary\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "source:").unwrap();
        writeln!(file, "  label: EMPLOYEE.FDB").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.source.display_label(), "EMPLOYEE.FDB");
    }

    #[test]
    fn test_hash_is_stable_and_sensitive() {
        let a = Config::default();
        let mut b = Config::default();
        assert_eq!(a.hash(), b.hash());
        b.translation.batch_size = 10;
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);
    }

    #[test]
    fn test_yaml_round_trip_via_init_template() {
        let yaml = Config::default().to_yaml().unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.translation.batch_size, 1000);
    }
}
