//! Extension discovery for AlbertoX3
//!
//! Scans an extensions root laid out as `root/<group>/<name>/` and returns a
//! descriptor for every candidate directory that ships the mandatory `ext`
//! unit. Nothing is activated here; discovery only reads the filesystem.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{debug, info, trace, warn};

use crate::error::{AlbertoError, Result};

use super::types::{ExtensionDescriptor, Feature, Features};

/// File suffix of extension units.
pub const UNIT_SUFFIX: &str = ".rs";

/// Discover extensions below `root`.
///
/// Groups are the immediate subdirectories of `root`, candidates the
/// immediate subdirectories of each group. A candidate is valid only if it
/// directly contains `ext.rs`; every other vocabulary unit it contains
/// (`colors.rs`, `db.rs`, ...) is recorded as a feature. Invalid candidates
/// are skipped silently.
///
/// # Errors
/// - `AlbertoError::Config` if `root` is missing or not a directory
/// - `AlbertoError::Io` if a directory listing fails midway
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use albertox3::extensions::discover_extensions;
///
/// let extensions = discover_extensions(Path::new("./extensions")).unwrap();
/// for ext in &extensions {
///     println!("{} ({})", ext.full_name(), ext.features);
/// }
/// ```
pub fn discover_extensions(root: &Path) -> Result<HashSet<ExtensionDescriptor>> {
    if !root.is_dir() {
        warn!(root = %root.display(), "Extensions folder is not a directory");
        return Err(AlbertoError::Config(format!(
            "Extensions folder {} does not exist or is not a directory",
            root.display()
        )));
    }

    let folder = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut extensions = HashSet::new();

    for group in fs::read_dir(root)? {
        let group = group?;
        let group_path = group.path();
        if !group_path.is_dir() {
            continue;
        }
        let group_name = group.file_name().to_string_lossy().to_string();

        for candidate in fs::read_dir(&group_path)? {
            let candidate = candidate?;
            let candidate_path = candidate.path();
            if !candidate_path.is_dir() {
                continue;
            }
            let name = candidate.file_name().to_string_lossy().to_string();

            let units = unit_names(&candidate_path)?;
            if !units.contains(Feature::Ext.unit_name()) {
                trace!(dir = %candidate_path.display(), "No ext unit, skipping");
                continue;
            }

            let features: Features = units
                .iter()
                .filter_map(|unit| Feature::from_unit_name(unit))
                .collect();

            let descriptor =
                ExtensionDescriptor::new(&folder, &group_name, name, candidate_path, features);
            debug!(
                extension = %descriptor.full_name(),
                features = %descriptor.features,
                "Discovered extension"
            );
            extensions.insert(descriptor);
        }
    }

    info!(
        root = %root.display(),
        count = extensions.len(),
        "Extension discovery finished"
    );

    Ok(extensions)
}

/// Names (without suffix) of the unit files directly inside `dir`.
fn unit_names(dir: &Path) -> Result<HashSet<String>> {
    let mut units = HashSet::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().to_string();
        if let Some(stem) = file_name.strip_suffix(UNIT_SUFFIX) {
            units.insert(stem.to_string());
        }
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Helper to create `root/<group>/<name>/` with the given unit files.
    fn make_extension(root: &Path, group: &str, name: &str, units: &[&str]) -> PathBuf {
        let dir = root.join(group).join(name);
        fs::create_dir_all(&dir).unwrap();
        for unit in units {
            fs::write(dir.join(unit), "// unit").unwrap();
        }
        dir
    }

    fn extensions_root() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("extensions");
        fs::create_dir(&root).unwrap();
        (tmp, root)
    }

    #[test]
    fn test_discover_valid_extensions() {
        let (_tmp, root) = extensions_root();
        make_extension(&root, "moderation", "ban", &["ext.rs", "db.rs", "colors.rs"]);
        make_extension(&root, "moderation", "kick", &["ext.rs"]);
        make_extension(&root, "settings", "language", &["ext.rs", "settings.rs"]);

        let found = discover_extensions(&root).unwrap();
        assert_eq!(found.len(), 3);

        let ban = found.iter().find(|e| e.name == "ban").unwrap();
        assert_eq!(ban.folder, "extensions");
        assert_eq!(ban.group, "moderation");
        assert_eq!(ban.package(), "extensions.moderation.ban");
        assert!(ban.features.has_ext());
        assert!(ban.features.has_db());
        assert!(ban.features.has_colors());
        assert!(!ban.features.has_settings());
    }

    #[test]
    fn test_discover_skips_candidates_without_ext() {
        let (_tmp, root) = extensions_root();
        make_extension(&root, "moderation", "mute", &["db.rs", "colors.rs"]);
        make_extension(&root, "moderation", "empty", &[]);
        // ext as a directory is not a unit
        fs::create_dir_all(root.join("moderation").join("odd").join("ext.rs")).unwrap();

        let found = discover_extensions(&root).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_discover_ignores_foreign_units_and_suffixes() {
        let (_tmp, root) = extensions_root();
        make_extension(
            &root,
            "moderation",
            "ban",
            &["ext.rs", "permission.rs", "helpers.rs", "stats.txt", "settings.rs"],
        );

        let found = discover_extensions(&root).unwrap();
        let ban = found.iter().next().unwrap();
        let features: Vec<Feature> = ban.features.iter().collect();
        assert_eq!(features, vec![Feature::Ext, Feature::Settings]);
    }

    #[test]
    fn test_discover_does_not_recurse() {
        let (_tmp, root) = extensions_root();
        make_extension(&root, "moderation", "nested", &[]);
        make_extension(&root.join("moderation"), "nested", "deep", &["ext.rs"]);
        // files at group level are ignored
        fs::write(root.join("README.rs"), "").unwrap();
        fs::write(root.join("moderation").join("ext.rs"), "").unwrap();

        let found = discover_extensions(&root).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_discover_is_idempotent() {
        let (_tmp, root) = extensions_root();
        make_extension(&root, "moderation", "ban", &["ext.rs"]);
        make_extension(&root, "administration", "roles", &["ext.rs", "permissions.rs"]);

        let first = discover_extensions(&root).unwrap();
        let second = discover_extensions(&root).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_discover_missing_root() {
        let result = discover_extensions(Path::new("/nonexistent/extensions"));
        assert!(matches!(result, Err(AlbertoError::Config(_))));
    }
}
