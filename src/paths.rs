use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Extension of files that can be converted
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

/// Name of the output directory created next to the inputs
pub const OUTPUT_DIR_NAME: &str = "html";

/// A classified command-line input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    File { path: PathBuf, output_dir: PathBuf },
    Directory { path: PathBuf, output_dir: PathBuf },
}

impl Input {
    pub fn output_dir(&self) -> &Path {
        match self {
            Self::File { output_dir, .. } | Self::Directory { output_dir, .. } => output_dir,
        }
    }
}

pub fn is_notebook(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == NOTEBOOK_EXTENSION)
}

/// Classify `path` and compute where its HTML goes
pub fn resolve(path: &Path) -> Result<Input> {
    if path.is_file() && is_notebook(path) {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        Ok(Input::File {
            path: path.to_path_buf(),
            output_dir: parent.join(OUTPUT_DIR_NAME),
        })
    } else if path.is_dir() {
        Ok(Input::Directory {
            path: path.to_path_buf(),
            output_dir: path.join(OUTPUT_DIR_NAME),
        })
    } else {
        Err(Error::InvalidPath {
            path: path.to_path_buf(),
        })
    }
}

/// Notebooks directly inside `dir`, sorted by path. Subdirectories are not entered.
pub fn list_notebooks(dir: &Path) -> Result<Vec<PathBuf>> {
    let read_dir_err = |source| Error::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut notebooks = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        if path.is_file() && is_notebook(&path) {
            notebooks.push(path);
        }
    }
    notebooks.sort();

    Ok(notebooks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_outputs_to_sibling_html_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nb = dir.path().join("report.ipynb");
        fs::write(&nb, "{}").unwrap();

        let input = resolve(&nb).unwrap();
        assert_eq!(
            input,
            Input::File {
                path: nb.clone(),
                output_dir: dir.path().join("html"),
            }
        );
    }

    #[test]
    fn directory_outputs_to_nested_html_dir() {
        let dir = tempfile::tempdir().unwrap();
        let input = resolve(dir.path()).unwrap();
        assert_eq!(input.output_dir(), dir.path().join("html"));
        assert!(matches!(input, Input::Directory { .. }));
    }

    #[test]
    fn rejects_missing_and_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("readme.txt");
        fs::write(&txt, "hello").unwrap();

        assert!(matches!(resolve(&txt), Err(Error::InvalidPath { .. })));
        assert!(matches!(
            resolve(&dir.path().join("missing.ipynb")),
            Err(Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn lists_only_immediate_notebooks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.ipynb"), "{}").unwrap();
        fs::write(dir.path().join("a.ipynb"), "{}").unwrap();
        fs::write(dir.path().join("readme.txt"), "").unwrap();
        fs::write(dir.path().join("notes.IPYNB.bak"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.ipynb"), "{}").unwrap();
        fs::create_dir(dir.path().join("dir.ipynb")).unwrap();

        let found = list_notebooks(dir.path()).unwrap();
        assert_eq!(
            found,
            vec![dir.path().join("a.ipynb"), dir.path().join("b.ipynb")]
        );
    }

    #[test]
    fn list_reports_unreadable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_notebooks(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, Error::ReadDir { .. }));
    }
}
