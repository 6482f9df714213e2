//! Catalog file discovery.

use std::fs;
use std::path::{Path, PathBuf};

use ayush_types::SourceSystem;

use crate::source::source_file_name;
use crate::target::TARGET_FILE_NAME;
use crate::types::{CatalogError, CatalogFiles, CatalogResult};

/// Discovers catalog CSV files in a data directory.
///
/// Looks in the directory itself and, failing that, in a `data/`
/// subdirectory. File names are matched case-insensitively.
pub fn discover_catalog_files<P: AsRef<Path>>(path: P) -> CatalogResult<CatalogFiles> {
    let path = path.as_ref();

    if !path.is_dir() {
        return Err(CatalogError::DirectoryNotFound {
            path: path.display().to_string(),
        });
    }

    let data_dir = find_data_dir(path);
    let mut files = CatalogFiles::new();

    for entry in fs::read_dir(&data_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().to_lowercase();

        if filename == TARGET_FILE_NAME.to_lowercase() {
            files.target_file = Some(entry.path());
            continue;
        }

        for system in SourceSystem::ALL {
            if filename == source_file_name(system) {
                let slot = match system {
                    SourceSystem::Ayurveda => &mut files.ayurveda_file,
                    SourceSystem::Siddha => &mut files.siddha_file,
                    SourceSystem::Unani => &mut files.unani_file,
                };
                *slot = Some(entry.path());
            }
        }
    }

    if !files.has_required_files() {
        return Err(CatalogError::RequiredFileMissing {
            catalog: files.missing_files().join(", "),
            directory: data_dir.display().to_string(),
        });
    }

    Ok(files)
}

/// Picks the directory holding the CSV exports.
fn find_data_dir(base: &Path) -> PathBuf {
    if base.join(TARGET_FILE_NAME).exists() {
        return base.to_path_buf();
    }

    let data = base.join("data");
    if data.is_dir() {
        return data;
    }

    base.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ayush-loader-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_discover_in_data_subdir() {
        let base = scratch_dir("discover-sub");
        let data = base.join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("ICD-11.csv"), "code,title\n").unwrap();
        fs::write(data.join("namaste_ayurveda_morbidity.csv"), "namc_code\n").unwrap();
        fs::write(data.join("namaste_unani_morbidity.csv"), "numc_code\n").unwrap();
        fs::write(data.join("notes.txt"), "ignored").unwrap();

        let files = discover_catalog_files(&base).unwrap();
        assert!(files.has_required_files());
        assert_eq!(files.target_file, Some(data.join("ICD-11.csv")));
        assert!(files.unani_file.is_some());
        assert!(files.siddha_file.is_none());

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_missing_required_catalog() {
        let base = scratch_dir("discover-missing");
        fs::write(base.join("ICD-11.csv"), "code,title\n").unwrap();

        let err = discover_catalog_files(&base).unwrap_err();
        match err {
            CatalogError::RequiredFileMissing { catalog, .. } => {
                assert_eq!(catalog, "NAMASTE Ayurveda");
            }
            other => panic!("unexpected error: {other}"),
        }

        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_directory_not_found() {
        let result = discover_catalog_files("/no/such/catalog/dir");
        assert!(matches!(result, Err(CatalogError::DirectoryNotFound { .. })));
    }
}
