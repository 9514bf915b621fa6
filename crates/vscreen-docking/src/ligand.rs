//! Ligand discovery and work-item identity.

use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};
use vscreen_common::{Result, ScreeningError};

/// One ligand file to be docked.
///
/// `raw_name` is the file name as listed (what the ledger stores); `base_name`
/// is the name without its extension and keys every other artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    raw_name: String,
    base_name: String,
}

impl WorkItem {
    /// Build a work item from a listed file name, stripping `.{extension}`.
    ///
    /// Fails with `InvalidItem` when nothing is left after stripping, or when
    /// the name contains a line break (the ledger is one name per line).
    pub fn from_file_name(raw_name: &str, extension: &str) -> Result<Self> {
        if raw_name.contains(['\n', '\r']) {
            return Err(ScreeningError::InvalidItem(raw_name.to_string()));
        }

        let suffix = format!(".{}", extension);
        let base_name = raw_name.strip_suffix(&suffix).unwrap_or(raw_name);

        if base_name.trim().is_empty() {
            return Err(ScreeningError::InvalidItem(raw_name.to_string()));
        }

        Ok(Self {
            raw_name: raw_name.to_string(),
            base_name: base_name.to_string(),
        })
    }

    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }
}

/// List the ligand files in `dir`, sorted by name.
///
/// Only regular files ending in `.{extension}` are returned. Names that are
/// not valid UTF-8 are skipped.
pub async fn discover_ligands(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let discovery_err = |source| ScreeningError::Discovery {
        dir: dir.to_path_buf(),
        source,
    };

    let suffix = format!(".{}", extension);
    let mut entries = fs::read_dir(dir).await.map_err(discovery_err)?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(discovery_err)? {
        let file_type = match entry.file_type().await {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Could not stat directory entry, skipping");
                continue;
            }
        };
        if file_type.is_dir() {
            continue;
        }

        let name = match entry.file_name().into_string() {
            Ok(n) => n,
            Err(raw) => {
                warn!(name = ?raw, "Skipping ligand with non UTF-8 file name");
                continue;
            }
        };

        if name.ends_with(&suffix) {
            names.push(name);
        }
    }

    names.sort();
    debug!(dir = %dir.display(), found = names.len(), "Ligand discovery complete");
    Ok(names)
}

/// Rewrite the manifest with one raw ligand name per line.
pub async fn write_manifest(path: &Path, names: &[String]) -> Result<()> {
    let mut content = String::with_capacity(names.iter().map(|n| n.len() + 1).sum());
    for name in names {
        content.push_str(name);
        content.push('\n');
    }
    fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_base_name_strips_extension() {
        let item = WorkItem::from_file_name("ZINC000123.pdbqt", "pdbqt").unwrap();
        assert_eq!(item.raw_name(), "ZINC000123.pdbqt");
        assert_eq!(item.base_name(), "ZINC000123");
    }

    #[test]
    fn test_only_last_extension_is_stripped() {
        let item = WorkItem::from_file_name("lig.min.pdbqt", "pdbqt").unwrap();
        assert_eq!(item.base_name(), "lig.min");
    }

    #[test]
    fn test_empty_identifier_rejected() {
        let err = WorkItem::from_file_name(".pdbqt", "pdbqt").unwrap_err();
        assert!(matches!(err, ScreeningError::InvalidItem(name) if name == ".pdbqt"));
    }

    #[test]
    fn test_line_breaks_rejected() {
        assert!(WorkItem::from_file_name("a\nb.pdbqt", "pdbqt").is_err());
        assert!(WorkItem::from_file_name("a\r.pdbqt", "pdbqt").is_err());
    }

    #[test]
    fn test_surrounding_whitespace_kept() {
        let item = WorkItem::from_file_name(" lig.pdbqt", "pdbqt").unwrap();
        assert_eq!(item.raw_name(), " lig.pdbqt");
        assert_eq!(item.base_name(), " lig");
    }

    #[tokio::test]
    async fn test_discover_filters_and_sorts() {
        let dir = tempdir().unwrap();
        for name in ["b.pdbqt", "a.pdbqt", "notes.txt", "c.pdbqt.bak"] {
            fs::write(dir.path().join(name), "").await.unwrap();
        }
        fs::create_dir(dir.path().join("nested.pdbqt")).await.unwrap();

        let found = discover_ligands(dir.path(), "pdbqt").await.unwrap();
        assert_eq!(found, vec!["a.pdbqt".to_string(), "b.pdbqt".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_discovery_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("ligand");

        let err = discover_ligands(&missing, "pdbqt").await.unwrap_err();
        assert!(matches!(err, ScreeningError::Discovery { .. }));
    }

    #[tokio::test]
    async fn test_manifest_lists_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ligand.txt");
        write_manifest(&path, &["a.pdbqt".to_string(), "b.pdbqt".to_string()])
            .await
            .unwrap();

        let content = fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "a.pdbqt\nb.pdbqt\n");
    }
}
