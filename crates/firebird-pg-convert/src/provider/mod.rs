//! Schema and data providers.
//!
//! The live Firebird client sits outside this crate; a JSON snapshot of the
//! catalog and rows implements the same [`SchemaProvider`] interface.

mod snapshot;

pub use snapshot::{Snapshot, SnapshotProvider, SnapshotTable};

use crate::config::SourceConfig;
use crate::core::SchemaProvider;
use crate::error::{ConvertError, Result};

/// Build the provider described by the `source` section.
pub fn from_source_config(source: &SourceConfig) -> Result<SnapshotProvider> {
    match source.snapshot {
        Some(ref path) => Ok(SnapshotProvider::new(path.clone())),
        None => Err(ConvertError::Config(
            "source.snapshot is required (path to a JSON database snapshot)".into(),
        )),
    }
}

/// Connect, run `f`, and close the provider whatever `f` returned.
pub fn with_connection<P, T, F>(provider: &mut P, f: F) -> Result<T>
where
    P: SchemaProvider + ?Sized,
    F: FnOnce(&mut P) -> Result<T>,
{
    provider.connect()?;
    let result = f(provider);
    provider.close();
    result
}
