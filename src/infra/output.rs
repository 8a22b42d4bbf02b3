//! JSON rendering of catalog listings for the command-line front end.

use std::io::{self, Write};

use crate::domain::entities::EnrichedAsset;

use super::error::InfraError;

const TARGET: &str = "catalog output";

/// Write `assets` as a pretty-printed JSON array followed by a newline.
pub fn write_assets<W: Write>(writer: &mut W, assets: &[EnrichedAsset]) -> Result<(), InfraError> {
    serde_json::to_writer_pretty(&mut *writer, assets).map_err(|err| {
        let source = match err.io_error_kind() {
            Some(kind) => io::Error::new(kind, err),
            None => io::Error::new(io::ErrorKind::InvalidData, err),
        };
        InfraError::output(TARGET, source)
    })?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|err| InfraError::output(TARGET, err))
}
