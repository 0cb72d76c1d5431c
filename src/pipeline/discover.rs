//! Submission discovery: scan a directory and pair documents with figures.
//!
//! Submitters name their files `Lastname_Firstname.docx` and, optionally,
//! `Lastname_Firstname.png`. Only immediate files are considered; the
//! submissions are sorted by base name so the book comes out alphabetical
//! by surname.

use crate::config::AssemblyConfig;
use crate::error::Abstract2TexError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One submission document and its matched figure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub path: PathBuf,
    /// File name with extension, e.g. `Smith_Jane.docx`.
    pub file_name: String,
    /// Base name, e.g. `Smith_Jane`.
    pub stem: String,
    pub figure: Option<PathBuf>,
}

struct Candidate {
    path: PathBuf,
    file_name: String,
    stem: String,
}

/// List the submissions in `dir`, sorted by base name, with figures paired.
///
/// Figures match on case-insensitive base name. When several figures share
/// a base name the first in file-name order wins.
pub fn discover(dir: &Path, config: &AssemblyConfig) -> Result<Vec<Submission>, Abstract2TexError> {
    if !dir.is_dir() {
        return Err(Abstract2TexError::InputDirNotFound {
            path: dir.to_path_buf(),
        });
    }
    let read_err = |source| Abstract2TexError::ReadDirFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut documents = Vec::new();
    let mut figures = Vec::new();

    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if !path.is_file() {
            continue;
        }
        let Some(candidate) = candidate(&path) else {
            continue;
        };
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };

        if ext.eq_ignore_ascii_case(&config.document_extension) {
            documents.push(candidate);
        } else if config
            .image_extensions
            .iter()
            .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        {
            figures.push(candidate);
        }
    }

    documents.sort_by(|a, b| a.stem.cmp(&b.stem).then_with(|| a.file_name.cmp(&b.file_name)));
    figures.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    debug!(
        "Discovered {} documents and {} figures in {}",
        documents.len(),
        figures.len(),
        dir.display()
    );

    Ok(documents
        .into_iter()
        .map(|doc| {
            let key = doc.stem.to_lowercase();
            let figure = figures
                .iter()
                .find(|f| f.stem.to_lowercase() == key)
                .map(|f| f.path.clone());
            Submission {
                path: doc.path,
                file_name: doc.file_name,
                stem: doc.stem,
                figure,
            }
        })
        .collect())
}

/// Name parts of a regular, visible, UTF-8-named file.
fn candidate(path: &Path) -> Option<Candidate> {
    let file_name = match path.file_name().map(|n| n.to_str()) {
        Some(Some(name)) => name.to_string(),
        Some(None) => {
            warn!("Skipping file with non-UTF-8 name: {}", path.display());
            return None;
        }
        None => return None,
    };
    // Word keeps `~$name.docx` owner files next to open documents.
    if file_name.starts_with("~$") || file_name.starts_with('.') {
        return None;
    }
    let stem = path.file_stem()?.to_str()?.to_string();
    Some(Candidate {
        path: path.to_path_buf(),
        file_name,
        stem,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) {
        fs::write(dir.path().join(name), b"x").unwrap();
    }

    #[test]
    fn sorts_submissions_and_pairs_figures_case_insensitively() {
        let dir = TempDir::new().unwrap();
        for name in [
            "Zhang_Wei.docx",
            "Adams_Ann.docx",
            "adams_ann.PNG",
            "Miller_Bob.docx",
            "notes.txt",
            "Zhang_Wei.gif",
            "output.tex",
        ] {
            touch(&dir, name);
        }
        fs::create_dir(dir.path().join("Nested_Dir.docx")).unwrap();

        let subs = discover(dir.path(), &AssemblyConfig::default()).unwrap();
        let stems: Vec<&str> = subs.iter().map(|s| s.stem.as_str()).collect();
        assert_eq!(stems, vec!["Adams_Ann", "Miller_Bob", "Zhang_Wei"]);

        assert_eq!(
            subs[0].figure.as_deref(),
            Some(dir.path().join("adams_ann.PNG").as_path())
        );
        assert!(subs[1].figure.is_none());
        assert!(subs[2].figure.is_none(), "gif is not in the allow-list");
    }

    #[test]
    fn first_figure_in_name_order_wins() {
        let dir = TempDir::new().unwrap();
        for name in ["Doe_Jo.docx", "Doe_Jo.png", "Doe_Jo.jpg"] {
            touch(&dir, name);
        }
        let subs = discover(dir.path(), &AssemblyConfig::default()).unwrap();
        assert_eq!(subs[0].figure, Some(dir.path().join("Doe_Jo.jpg")));
    }

    #[test]
    fn ignores_lock_and_hidden_files() {
        let dir = TempDir::new().unwrap();
        for name in ["~$Doe_Jo.docx", ".Doe_Jo.docx", "Doe_Jo.docx"] {
            touch(&dir, name);
        }
        let subs = discover(dir.path(), &AssemblyConfig::default()).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].file_name, "Doe_Jo.docx");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = discover(Path::new("/no/such/abstracts"), &AssemblyConfig::default())
            .unwrap_err();
        assert!(matches!(err, Abstract2TexError::InputDirNotFound { .. }));
    }
}
