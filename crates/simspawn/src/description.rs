//! Robot description loading

use crate::error::{Result, SpawnerError};
use simspawn_core::{DescriptionFormat, ModelDescription};
use std::path::Path;
use tracing::debug;

/// Read a URDF/SDF file fully into memory.
///
/// A missing or unreadable file is fatal: there is nothing to spawn without
/// it. The format comes from `format` when given, otherwise from the root
/// element of the document.
pub fn load_description(
    path: impl AsRef<Path>,
    format: Option<DescriptionFormat>,
) -> Result<ModelDescription> {
    let path = path.as_ref();

    let xml = std::fs::read_to_string(path).map_err(|source| SpawnerError::Description {
        path: path.to_path_buf(),
        source,
    })?;

    let description = match format {
        Some(format) => ModelDescription::new(format, xml),
        None => ModelDescription::detect(xml)?,
    };

    debug!(
        path = %path.display(),
        format = %description.format(),
        bytes = description.xml().len(),
        "Loaded model description"
    );

    Ok(description)
}
