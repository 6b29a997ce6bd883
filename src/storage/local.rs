use std::path::{Path, PathBuf};
use tokio::fs;

use crate::errors::{AppError, Result};

/// Upload directory that is also served under `/uploads`, so every stored
/// file has a public URL the restoration provider can fetch.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new<P: AsRef<Path>>(base_path: P, public_base_url: &str) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();

        std::fs::create_dir_all(&base_path)
            .map_err(|e| AppError::Storage(format!("Failed to create storage directory: {}", e)))?;

        Ok(Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn get_full_path(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    pub fn public_url(&self, name: &str) -> String {
        format!("{}/uploads/{}", self.public_base_url, name)
    }

    pub async fn store_bytes(&self, name: &str, data: &[u8]) -> Result<()> {
        fs::write(self.get_full_path(name), data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {}", e)))
    }
}
