// src/resolve/path.rs

use std::path::{Path, PathBuf};

use crate::error::ExtrasError;

/// Computes where a plugin writes its generated sources. Never touches the filesystem.
pub struct PathResolver;

impl PathResolver {
    /// `explicit` wins verbatim; otherwise `(base_override or default_base)/id`.
    pub fn resolve(
        explicit: Option<&Path>,
        base_override: Option<&Path>,
        default_base: Option<&Path>,
        id: &str,
    ) -> Result<PathBuf, ExtrasError> {
        if let Some(dir) = explicit {
            return Ok(dir.to_path_buf());
        }

        base_override
            .or(default_base)
            .map(|base| base.join(id))
            .ok_or_else(|| ExtrasError::MissingOutputBase {
                plugin_id: id.to_string(),
            })
    }
}
