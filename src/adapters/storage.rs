use crate::domain::ports::Storage;
use crate::utils::error::{ModuleError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem storage rooted at `base_path`. Absolute paths bypass the root.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path);
        fs::read(&full_path).map_err(|e| ModuleError::io(full_path.display().to_string(), e))
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ModuleError::io(parent.display().to_string(), e))?;
        }

        fs::write(&full_path, data).map_err(|e| ModuleError::io(full_path.display().to_string(), e))
    }
}
