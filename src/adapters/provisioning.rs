//! Fetches the renderer release archive when the binary is not installed yet.

use crate::config::toml_config::ComponentConfig;
use crate::utils::error::{InvoiceError, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Path, PathBuf};

pub fn binary_name() -> &'static str {
    if cfg!(windows) {
        "invoice.exe"
    } else {
        "invoice"
    }
}

/// Release naming for `std::env::consts::OS`.
pub fn platform_name(os: &str) -> Option<&'static str> {
    match os {
        "windows" => Some("windows"),
        "macos" => Some("darwin"),
        "linux" => Some("linux"),
        _ => None,
    }
}

/// Release naming for `std::env::consts::ARCH`.
pub fn arch_name(arch: &str) -> Option<&'static str> {
    match arch {
        "x86" => Some("386"),
        "x86_64" => Some("amd64"),
        "aarch64" => Some("arm64"),
        _ => None,
    }
}

pub fn release_url(template: &str, version: &str, os: &str, arch: &str) -> Result<String> {
    let platform = platform_name(os).ok_or_else(|| {
        InvoiceError::provisioning(format!("no renderer release for platform '{}'", os))
    })?;
    let arch = arch_name(arch).ok_or_else(|| {
        InvoiceError::provisioning(format!("no renderer release for architecture '{}'", arch))
    })?;

    Ok(template
        .replace("{version}", version)
        .replace("{platform}", platform)
        .replace("{arch}", arch))
}

/// Returns the renderer path, downloading and unpacking the release first if it is missing.
pub async fn ensure_renderer(config: &ComponentConfig) -> Result<PathBuf> {
    let binary_path = config.binary_path()?;
    if tokio::fs::try_exists(&binary_path).await.unwrap_or(false) {
        tracing::debug!("Renderer found at {}", binary_path.display());
        return Ok(binary_path);
    }

    if !config.provisioning.enabled {
        return Err(InvoiceError::provisioning(format!(
            "renderer missing at {} and provisioning is disabled",
            binary_path.display()
        )));
    }

    let install_dir = config.install_dir()?;
    let url = release_url(
        &config.provisioning.url_template,
        &config.provisioning.version,
        std::env::consts::OS,
        std::env::consts::ARCH,
    )?;
    tracing::info!(
        "📥 Renderer not found, downloading {} into {}",
        url,
        install_dir.display()
    );

    install_from_url(&url, &install_dir).await?;

    if !tokio::fs::try_exists(&binary_path).await.unwrap_or(false) {
        return Err(InvoiceError::provisioning(format!(
            "archive from {} did not contain {}",
            url,
            config.binary_file_name()
        )));
    }
    make_executable(&binary_path)?;

    tracing::info!("✅ Renderer installed at {}", binary_path.display());
    Ok(binary_path)
}

/// Downloads an archive, unpacks it into `install_dir` and removes the archive.
pub async fn install_from_url(url: &str, install_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(install_dir).await?;

    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(InvoiceError::provisioning(format!(
            "download of {} failed with status {}",
            url,
            response.status()
        )));
    }
    let bytes = response.bytes().await?;
    tracing::debug!("Downloaded {} bytes", bytes.len());

    let format = ArchiveFormat::from_url(url)?;
    let archive_path = install_dir.join(format.download_name());
    tokio::fs::write(&archive_path, &bytes).await?;

    let target = install_dir.to_path_buf();
    let source = archive_path.clone();
    let extracted = tokio::task::spawn_blocking(move || format.extract(&source, &target))
        .await
        .map_err(|e| InvoiceError::provisioning(format!("extraction task failed: {}", e)))?;

    if let Err(e) = tokio::fs::remove_file(&archive_path).await {
        tracing::warn!("Could not remove {}: {}", archive_path.display(), e);
    }
    extracted
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn from_url(url: &str) -> Result<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if path.ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(InvoiceError::provisioning(format!(
                "unsupported archive format: {}",
                url
            )))
        }
    }

    fn download_name(self) -> &'static str {
        match self {
            Self::TarGz => "invoice.tar.gz",
            Self::Zip => "invoice.zip",
        }
    }

    fn extract(self, archive_path: &Path, target: &Path) -> Result<()> {
        let file = File::open(archive_path)?;
        match self {
            Self::TarGz => {
                let mut archive = tar::Archive::new(GzDecoder::new(file));
                archive.unpack(target)?;
            }
            Self::Zip => {
                let mut archive = zip::ZipArchive::new(file)?;
                archive.extract(target)?;
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    std::fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
