//! `CodeMode`: a restricted-tools subprofile. A model-level `code_mode`
//! block replaces the default one wholesale — it is never field-merged.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ResolveError;

/// Marker file documenting a local module root, checked by
/// [`validate_local_module_paths`]. Format-agnostic by design: its contents
/// are never parsed, only its presence.
pub const MODULE_MARKER_FILE: &str = "cpe.module";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMode {
    #[serde(default)]
    pub local_module_paths: Vec<PathBuf>,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
}

/// Expands `~` and resolves each path against `base_dir`, rejecting
/// duplicates and paths without a [`MODULE_MARKER_FILE`].
///
/// `seen` carries canonical paths already claimed elsewhere in the config
/// (the resolved `conversationStoragePath`, any module path already
/// validated) so a `localModulePaths` entry that resolves to the same
/// canonical path as another config path is rejected too, not just
/// duplicates within this list.
pub fn validate_local_module_paths(
    paths: &[PathBuf],
    base_dir: &Path,
    seen: &mut HashSet<PathBuf>,
) -> Result<Vec<PathBuf>, ResolveError> {
    let mut resolved = Vec::with_capacity(paths.len());
    for raw in paths {
        let expanded = crate::resolve::expand_tilde(raw)?;
        let full = if expanded.is_absolute() {
            expanded
        } else {
            base_dir.join(expanded)
        };
        let full = full
            .canonicalize()
            .unwrap_or(full);
        if !seen.insert(full.clone()) {
            return Err(ResolveError::DuplicatePath(full.display().to_string()));
        }
        if !full.join(MODULE_MARKER_FILE).exists() {
            return Err(ResolveError::MissingModuleManifest(full.display().to_string()));
        }
        resolved.push(full);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_without_marker_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("mymodule");
        std::fs::create_dir_all(&module_dir).unwrap();
        let mut seen = HashSet::new();
        let err = validate_local_module_paths(&[module_dir.clone()], dir.path(), &mut seen)
            .unwrap_err();
        assert!(matches!(err, ResolveError::MissingModuleManifest(_)));
    }

    #[test]
    fn path_with_marker_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("mymodule");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(module_dir.join(MODULE_MARKER_FILE), "").unwrap();
        let mut seen = HashSet::new();
        let resolved = validate_local_module_paths(&[module_dir], dir.path(), &mut seen).unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn duplicate_resolved_paths_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("mymodule");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(module_dir.join(MODULE_MARKER_FILE), "").unwrap();
        let mut seen = HashSet::new();
        let err =
            validate_local_module_paths(&[module_dir.clone(), module_dir], dir.path(), &mut seen)
                .unwrap_err();
        assert!(matches!(err, ResolveError::DuplicatePath(_)));
    }

    #[test]
    fn module_path_colliding_with_another_seen_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let module_dir = dir.path().join("mymodule");
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(module_dir.join(MODULE_MARKER_FILE), "").unwrap();
        let mut seen = HashSet::new();
        seen.insert(module_dir.canonicalize().unwrap());
        let err = validate_local_module_paths(&[module_dir], dir.path(), &mut seen).unwrap_err();
        assert!(matches!(err, ResolveError::DuplicatePath(_)));
    }
}
