use crate::error::{EtlError, Result};
use glob::{glob, Pattern};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Find the CSV to load under `root`.
///
/// Every `*.csv` file in the tree is a candidate except those listed in
/// `ignore` (the pipeline's own output lives in the same directory). Ties
/// are broken by taking the lexicographically smallest path, so the pick does
/// not depend on filesystem enumeration order.
pub fn locate_csv(root: &Path, ignore: &[PathBuf]) -> Result<PathBuf> {
    let locate_err = |source: io::Error| EtlError::Locate {
        root: root.to_path_buf(),
        source,
    };

    let pattern = format!(
        "{}/**/*.csv",
        Pattern::escape(&root.to_string_lossy()).trim_end_matches('/')
    );
    let ignored: Vec<PathBuf> = ignore.iter().map(|p| normalize(p)).collect();

    let mut found = None::<PathBuf>;
    let entries = glob(&pattern)
        .map_err(|e| locate_err(io::Error::new(io::ErrorKind::InvalidInput, e.to_string())))?;
    for entry in entries {
        let path = entry.map_err(|e| locate_err(io::Error::from(e)))?;
        if !path.is_file() {
            continue;
        }
        if ignored.contains(&normalize(&path)) {
            debug!(path = %path.display(), "skipping pipeline output");
            continue;
        }
        if found.as_ref().map_or(true, |best| path < *best) {
            found = Some(path);
        }
    }

    match found {
        Some(path) => {
            info!(path = %path.display(), "located dataset");
            Ok(path)
        }
        None => Err(EtlError::NoCsvFound {
            root: root.to_path_buf(),
        }),
    }
}

fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "a,b\n1,2\n").unwrap();
        path
    }

    #[test]
    fn finds_nested_csv() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "README.txt");
        let csv = touch(dir.path(), "openpowerlifting-2024-01-06/openpowerlifting.csv");
        assert_eq!(locate_csv(dir.path(), &[]).unwrap(), csv);
    }

    #[test]
    fn lexicographic_tie_break() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "z/last.csv");
        let first = touch(dir.path(), "b/first.csv");
        touch(dir.path(), "c.csv");
        assert_eq!(locate_csv(dir.path(), &[]).unwrap(), first);
    }

    #[test]
    fn ignores_previous_output() {
        let dir = tempdir().unwrap();
        let output = touch(dir.path(), "powerlifting_data.csv");
        let source = touch(dir.path(), "raw/lifters.csv");
        assert_eq!(locate_csv(dir.path(), &[output]).unwrap(), source);
    }

    #[test]
    fn directories_named_like_csv_do_not_count() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("odd.csv")).unwrap();
        let err = locate_csv(dir.path(), &[]).unwrap_err();
        assert!(matches!(err, EtlError::NoCsvFound { .. }));
        assert_eq!(err.stage(), Stage::Locator);
    }

    #[test]
    fn extension_match_is_exact() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "data.csv.sha256");
        touch(dir.path(), "DATA.CSV");
        assert!(locate_csv(dir.path(), &[]).is_err());
    }
}
