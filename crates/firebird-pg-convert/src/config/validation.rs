//! Configuration validation and table filtering.

use super::{Config, TranslationConfig};
use crate::error::{ConvertError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let t = &config.translation;

    if t.batch_size == 0 {
        return Err(ConvertError::Config(
            "translation.batch_size must be at least 1".into(),
        ));
    }
    if let Some(0) = t.insert_chunk_size {
        return Err(ConvertError::Config(
            "translation.insert_chunk_size must be at least 1".into(),
        ));
    }
    if let Some(ref path) = config.source.snapshot {
        if path.as_os_str().is_empty() {
            return Err(ConvertError::Config(
                "source.snapshot cannot be empty".into(),
            ));
        }
    }

    // Surface bad patterns at load time rather than mid-run
    TableFilter::from_config(t)?;

    Ok(())
}

/// Include/exclude filter over table names.
#[derive(Debug, Clone)]
pub struct TableFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl TableFilter {
    /// Build from `include_tables` / `exclude_tables`.
    pub fn from_config(config: &TranslationConfig) -> Result<Self> {
        Ok(Self {
            include: build_set(&config.include_tables, "include_tables")?,
            exclude: build_set(&config.exclude_tables, "exclude_tables")?,
        })
    }

    /// True if the table passes both lists.
    pub fn matches(&self, table: &str) -> bool {
        let name = table.to_lowercase();
        if let Some(ref include) = self.include {
            if !include.is_match(&name) {
                return false;
            }
        }
        match self.exclude {
            Some(ref exclude) => !exclude.is_match(&name),
            None => true,
        }
    }
}

fn build_set(patterns: &[String], field: &str) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(&pattern.to_lowercase()).map_err(|e| {
            ConvertError::Config(format!(
                "translation.{} has invalid pattern '{}': {}",
                field, pattern, e
            ))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| ConvertError::Config(format!("translation.{}: {}", field, e)))
}
