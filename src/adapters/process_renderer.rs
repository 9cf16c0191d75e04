use crate::config::toml_config::ComponentConfig;
use crate::domain::ports::Renderer;
use crate::utils::error::{InvoiceError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const STDERR_SNIPPET_LIMIT: usize = 512;

/// Runs the renderer binary directly (argv, no shell) and waits for it with a hard timeout.
#[derive(Debug, Clone)]
pub struct ProcessRenderer {
    binary_path: PathBuf,
    timeout: Duration,
}

impl ProcessRenderer {
    pub fn new(binary_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ComponentConfig) -> Result<Self> {
        Ok(Self::new(config.binary_path()?, config.timeout()))
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl Renderer for ProcessRenderer {
    async fn render(&self, args: &[String], output_path: &Path) -> Result<()> {
        tracing::debug!(
            "Spawning renderer {} with {} arguments",
            self.binary_path.display(),
            args.len()
        );

        let child = Command::new(&self.binary_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                InvoiceError::render(format!(
                    "failed to start {}: {}",
                    self.binary_path.display(),
                    e
                ))
            })?;

        // 逾時後 future 被丟棄，kill_on_drop 會終止子行程
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                InvoiceError::render(format!("failed waiting for renderer: {}", e))
            })?,
            Err(_) => {
                tracing::warn!("Renderer exceeded {:?}, killed", self.timeout);
                return Err(InvoiceError::RenderTimeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let snippet: String = stderr.trim().chars().take(STDERR_SNIPPET_LIMIT).collect();
            return Err(InvoiceError::render(format!(
                "renderer exited with {}: {}",
                output.status, snippet
            )));
        }

        if !tokio::fs::try_exists(output_path).await.unwrap_or(false) {
            return Err(InvoiceError::render(format!(
                "renderer exited successfully but wrote no file at {}",
                output_path.display()
            )));
        }

        tracing::debug!("Renderer wrote {}", output_path.display());
        Ok(())
    }
}
