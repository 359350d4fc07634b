use async_trait::async_trait;
use fishbone::ImportHost;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Filesystem-backed import host.
///
/// There is no interactive chooser on the command line, so the import
/// source comes straight from the placeholder's `request` hint; relative
/// hints resolve against the importing document's directory. Placeholders
/// without a hint are treated as cancelled.
pub struct FsHost {
    base_dir: PathBuf,
}

impl FsHost {
    pub fn for_document(doc_path: &Path) -> Self {
        FsHost {
            base_dir: doc_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf(),
        }
    }
}

#[async_trait]
impl ImportHost for FsHost {
    async fn pick_import_source(&self, request: Option<&Value>) -> Option<PathBuf> {
        let Some(hint) = request.and_then(Value::as_str) else {
            self.warn("import carries no source hint, removing it");
            return None;
        };
        let path = Path::new(hint);
        if path.is_absolute() {
            Some(path.to_path_buf())
        } else {
            Some(self.base_dir.join(path))
        }
    }

    async fn read_document(&self, path: &Path) -> std::io::Result<String> {
        fs::read_to_string(path).await
    }

    fn warn(&self, message: &str) {
        eprintln!("Warning: {}", message);
    }
}
