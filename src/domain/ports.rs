use crate::domain::model::{MaterializedFile, PutOptions, RenderedArtifact};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Host storage collaborator (publish rendered files, resolve uploaded ones).
pub trait ContentStore: Send + Sync {
    fn put_temp(
        &self,
        data: Vec<u8>,
        options: PutOptions,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> impl std::future::Future<Output = Result<RenderedArtifact>> + Send;

    fn get_by_fid(
        &self,
        fid: &str,
    ) -> impl std::future::Future<Output = Result<MaterializedFile>> + Send;
}

/// The external invoice renderer. `args` is the full argument vector after the binary name.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, args: &[String], output_path: &Path) -> Result<()>;
}
