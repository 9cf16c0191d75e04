use crate::config::toml_config::ComponentConfig;
use crate::domain::model::{MaterializedFile, PutOptions, RenderedArtifact};
use crate::domain::ports::ContentStore;
use crate::utils::error::{InvoiceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SCRATCH_DIR: &str = "tmp";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMetadata {
    pub fid: String,
    pub mime_type: String,
    pub user_id: String,
    pub file_name: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Filesystem-backed storage collaborator: one blob plus one `.meta.json` sidecar per fid.
#[derive(Debug, Clone)]
pub struct LocalContentStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl LocalContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_base_url: None,
        }
    }

    pub fn from_config(config: &ComponentConfig) -> Self {
        Self {
            root: config.storage_root(),
            public_base_url: config.storage.public_base_url.clone(),
        }
    }

    pub fn with_public_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.public_base_url = Some(base_url.into());
        self
    }

    pub async fn metadata(&self, fid: &str) -> Result<StoredMetadata> {
        let path = self.meta_path(fid)?;
        let raw = tokio::fs::read(&path)
            .await
            .map_err(|_| InvoiceError::storage(format!("unknown fid '{}'", fid)))?;
        Ok(serde_json::from_slice(&raw)?)
    }

    fn blob_path(&self, fid: &str) -> Result<PathBuf> {
        validate_fid(fid)?;
        Ok(self.root.join(fid))
    }

    fn meta_path(&self, fid: &str) -> Result<PathBuf> {
        validate_fid(fid)?;
        Ok(self.root.join(format!("{}.meta.json", fid)))
    }

    fn url_for(&self, fid: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), fid),
            None => format!("/fid/{}", fid),
        }
    }
}

// fid 會成為檔名，只允許 uuid 類字元
fn validate_fid(fid: &str) -> Result<()> {
    if fid.is_empty() || !fid.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(InvoiceError::storage(format!("invalid fid '{}'", fid)));
    }
    Ok(())
}

impl ContentStore for LocalContentStore {
    async fn put_temp(
        &self,
        data: Vec<u8>,
        options: PutOptions,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<RenderedArtifact> {
        let fid = Uuid::new_v4().to_string();
        tokio::fs::create_dir_all(&self.root).await?;

        let size = data.len() as u64;
        tokio::fs::write(self.blob_path(&fid)?, &data).await?;

        let stored = StoredMetadata {
            fid: fid.clone(),
            mime_type: options.mime_type.clone(),
            user_id: options.user_id,
            file_name: options.file_name.clone(),
            size,
            created_at: Utc::now(),
            metadata,
        };
        tokio::fs::write(self.meta_path(&fid)?, serde_json::to_vec_pretty(&stored)?).await?;

        tracing::debug!("Stored {} ({} bytes) as {}", options.file_name, size, fid);
        Ok(RenderedArtifact {
            url: self.url_for(&fid),
            fid,
            mime_type: options.mime_type,
            file_name: options.file_name,
            size,
        })
    }

    async fn get_by_fid(&self, fid: &str) -> Result<MaterializedFile> {
        let blob = self.blob_path(fid)?;
        if !tokio::fs::try_exists(&blob).await.unwrap_or(false) {
            return Err(InvoiceError::storage(format!("unknown fid '{}'", fid)));
        }

        // 保留原始副檔名，renderer 依副檔名判斷圖片格式
        let extension = self
            .metadata(fid)
            .await
            .ok()
            .and_then(|meta| {
                Path::new(&meta.file_name)
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
            });

        let scratch_dir = self.root.join(SCRATCH_DIR);
        tokio::fs::create_dir_all(&scratch_dir).await?;
        let mut local_name = format!("{}-{}", fid, Uuid::new_v4().simple());
        if let Some(ext) = extension {
            local_name.push('.');
            local_name.push_str(&ext);
        }
        let local_path = scratch_dir.join(local_name);
        tokio::fs::copy(&blob, &local_path).await?;

        let cleanup_path = local_path.clone();
        Ok(MaterializedFile::new(
            local_path,
            Some(Box::new(move || std::fs::remove_file(&cleanup_path))),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(file_name: &str) -> PutOptions {
        PutOptions {
            mime_type: "image/png".to_string(),
            user_id: "user-1".to_string(),
            file_name: file_name.to_string(),
        }
    }

    #[test]
    fn test_rejects_path_like_fids() {
        assert!(validate_fid("../etc/passwd").is_err());
        assert!(validate_fid("").is_err());
        assert!(validate_fid("0b7c9b1e-2f3a-4c1d-9e8f-1234567890ab").is_ok());
    }

    #[test]
    fn test_url_uses_public_base() {
        let store = LocalContentStore::new("/data").with_public_base_url("https://cdn.example.com/");
        assert_eq!(store.url_for("abc"), "https://cdn.example.com/abc");
        assert_eq!(LocalContentStore::new("/data").url_for("abc"), "/fid/abc");
    }

    #[test]
    fn test_put_then_materialize() {
        let dir = TempDir::new().unwrap();
        let store = LocalContentStore::new(dir.path());

        tokio_test::block_on(async {
            let artifact = store
                .put_temp(b"PNGDATA".to_vec(), options("logo.png"), serde_json::Map::new())
                .await
                .unwrap();
            assert_eq!(artifact.size, 7);
            assert_eq!(artifact.mime_type, "image/png");

            let meta = store.metadata(&artifact.fid).await.unwrap();
            assert_eq!(meta.user_id, "user-1");
            assert_eq!(meta.file_name, "logo.png");

            let file = store.get_by_fid(&artifact.fid).await.unwrap();
            let local = file.path().to_path_buf();
            assert_eq!(local.extension().unwrap(), "png");
            assert_eq!(std::fs::read(&local).unwrap(), b"PNGDATA");

            file.release().unwrap();
            assert!(!local.exists());
        });
    }

    #[test]
    fn test_unknown_fid() {
        let dir = TempDir::new().unwrap();
        let store = LocalContentStore::new(dir.path());
        let err = tokio_test::block_on(store.get_by_fid("missing")).unwrap_err();
        assert!(matches!(err, InvoiceError::Storage { .. }));
    }
}
