use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Raw operation payload as the host hands it over. Nothing here is trusted yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub due: Option<String>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub items: Option<String>,
    #[serde(default)]
    pub logo: Option<LogoReference>,
}

/// A previously uploaded image, either already stored or still attached to an upload ticket.
/// Anything else (e.g. only a `url`) carries no file and is never fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogoReference {
    Direct {
        fid: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    PendingUpload {
        ticket: UploadTicket,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    // 必須放最後，untagged 依序嘗試
    Detached {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTicket {
    pub fid: String,
}

impl LogoReference {
    pub fn fid(&self) -> Option<&str> {
        match self {
            Self::Direct { fid, .. } => Some(fid),
            Self::PendingUpload { ticket, .. } => Some(&ticket.fid),
            Self::Detached { .. } => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Direct { url, .. }
            | Self::PendingUpload { url, .. }
            | Self::Detached { url } => url.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub quantity: u32,
    pub item_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
}

impl LineItem {
    /// `quantity × rate`, `None` when the product does not fit in a `Decimal`.
    pub fn amount(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.rate)
    }
}

/// The canonical JSON half of the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDocument {
    pub from: String,
    pub to: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub items: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub item_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl InvoiceDocument {
    /// `<title> - <id> - <to>.pdf`
    pub fn pdf_file_name(&self) -> String {
        format!(
            "{} - {} - {}.pdf",
            self.title.as_deref().unwrap_or("Invoice"),
            self.id,
            self.to
        )
    }
}

/// Storage collaborator's handle on a published file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedArtifact {
    pub fid: String,
    pub url: String,
    pub mime_type: String,
    pub file_name: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub json: InvoiceDocument,
    pub pdf: RenderedArtifact,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub item_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_total: Decimal,
}

#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub user_id: String,
}

impl InvocationContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutOptions {
    pub mime_type: String,
    pub user_id: String,
    pub file_name: String,
}

pub type CleanupFn = Box<dyn FnOnce() -> std::io::Result<()> + Send>;

/// A stored object copied to a local path for the duration of one render.
pub struct MaterializedFile {
    path: PathBuf,
    cleanup: Option<CleanupFn>,
}

impl MaterializedFile {
    pub fn new(path: PathBuf, cleanup: Option<CleanupFn>) -> Self {
        Self { path, cleanup }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) -> std::io::Result<()> {
        match self.cleanup.take() {
            Some(cleanup) => cleanup(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MaterializedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializedFile")
            .field("path", &self.path)
            .field("has_cleanup", &self.cleanup.is_some())
            .finish()
    }
}
