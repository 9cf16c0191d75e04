use crate::core::invocation::build_args;
use crate::core::line_items::parse_items;
use crate::core::sanitize::{sanitize, sanitize_non_empty};
use crate::domain::descriptor::ComponentDescriptor;
use crate::domain::model::{
    InvocationContext, InvoiceDocument, InvoiceRequest, InvoiceResponse, LogoReference,
    MaterializedFile, PutOptions, RenderedArtifact, PDF_MIME_TYPE,
};
use crate::domain::ports::{ContentStore, Renderer};
use crate::utils::error::{InvoiceError, Result};
use rust_decimal::Decimal;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Instrument;

/// Per-invocation progress. `Failed` is reachable from every stage before `Cleaning` and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Sanitizing,
    Parsing,
    ArgsBuilt,
    Invoking,
    Invoked,
    Publishing,
    Cleaning,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Sanitizing => "sanitizing",
            Stage::Parsing => "parsing",
            Stage::ArgsBuilt => "args_built",
            Stage::Invoking => "invoking",
            Stage::Invoked => "invoked",
            Stage::Publishing => "publishing",
            Stage::Cleaning => "cleaning",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct StageTracker {
    current: Stage,
}

impl StageTracker {
    fn new() -> Self {
        tracing::debug!(stage = %Stage::Received, "Invoice request received");
        Self {
            current: Stage::Received,
        }
    }

    /// `Failed` 為終態，之後的清理只記錄不轉移
    fn advance(&mut self, next: Stage) {
        if self.current == Stage::Failed {
            tracing::debug!(stage = %self.current, step = %next, "Running after failure");
            return;
        }
        tracing::debug!(from = %self.current, to = %next, "Stage transition");
        self.current = next;
    }

    fn check<T>(&mut self, action: &'static str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            tracing::warn!(stage = %self.current, action, error = %e, "Invoice generation failed");
            self.current = Stage::Failed;
        }
        result
    }
}

/// Free-text fields after sanitizing, waiting for the items to be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedFields {
    pub from: String,
    pub to: String,
    pub tax: Decimal,
    pub id: String,
    pub note: Option<String>,
    pub due: Option<String>,
    pub title: Option<String>,
    pub currency: Option<String>,
    pub logo: Option<String>,
}

/// Sanitized fields plus the computed totals, before any I/O happens.
pub fn build_document(request: &InvoiceRequest) -> Result<InvoiceDocument> {
    let fields = sanitize_fields(request)?;
    assemble_document(fields, request.items.as_deref().unwrap_or_default())
}

pub fn sanitize_fields(request: &InvoiceRequest) -> Result<SanitizedFields> {
    let descriptor = ComponentDescriptor::generate_invoice();
    for field in descriptor.required_inputs() {
        let present = match field {
            "from" => request.from.is_some(),
            "to" => request.to.is_some(),
            "tax" => request.tax.is_some(),
            "items" => request.items.is_some(),
            _ => true,
        };
        if !present {
            return Err(InvoiceError::validation(format!(
                "missing required field '{}'",
                field
            )));
        }
    }

    let from = required_text("from", request.from.as_deref())?;
    let to = required_text("to", request.to.as_deref())?;
    let title = sanitize(request.title.as_deref())?;
    let note = sanitize(request.note.as_deref())?;
    let currency = sanitize(request.currency.as_deref())?;
    let id = sanitize_non_empty(request.id.as_deref())?.unwrap_or_else(default_invoice_id);
    let due = sanitize(request.due.as_deref())?;
    let tax = parse_tax(request.tax)?;

    Ok(SanitizedFields {
        from,
        to,
        tax,
        id,
        note,
        due,
        title,
        currency,
        logo: request
            .logo
            .as_ref()
            .and_then(|logo| logo.url())
            .map(str::to_string),
    })
}

/// Parses the items and computes `taxTotal = itemTotal × tax`, `total = itemTotal + taxTotal`.
pub fn assemble_document(fields: SanitizedFields, items: &str) -> Result<InvoiceDocument> {
    let items = parse_items(items)?;
    let item_total = items.item_total;
    let (tax_total, total) = item_total
        .checked_mul(fields.tax)
        .and_then(|tax_total| Some((tax_total, item_total.checked_add(tax_total)?)))
        .ok_or_else(|| InvoiceError::validation("invoice total too large"))?;

    Ok(InvoiceDocument {
        from: fields.from,
        to: fields.to,
        tax: fields.tax,
        id: fields.id,
        note: fields.note,
        items: items.line_items,
        item_total,
        tax_total,
        total,
        due: fields.due,
        title: fields.title,
        currency: fields.currency,
        logo: fields.logo,
    })
}

fn required_text(field: &str, value: Option<&str>) -> Result<String> {
    sanitize_non_empty(value)?
        .ok_or_else(|| InvoiceError::validation(format!("missing required field '{}'", field)))
}

fn parse_tax(tax: Option<f64>) -> Result<Decimal> {
    let tax = tax.ok_or_else(|| InvoiceError::validation("missing required field 'tax'"))?;
    if !tax.is_finite() || !(0.0..=1.0).contains(&tax) {
        return Err(InvoiceError::validation(format!(
            "tax must be between 0 and 1 (got {})",
            tax
        )));
    }
    // f64 的 Display 是最短表示，0.1 -> "0.1"
    Decimal::from_str(&tax.to_string())
        .map_err(|e| InvoiceError::validation(format!("invalid tax {}: {}", tax, e)))
}

fn default_invoice_id() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Holds a materialized logo until the render is over; released exactly once.
struct LogoGuard {
    file: Option<MaterializedFile>,
}

impl LogoGuard {
    fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|file| file.path())
    }

    fn release(&mut self) {
        if let Some(file) = self.file.take() {
            let path = file.path().to_path_buf();
            if let Err(e) = file.release() {
                tracing::warn!("Error cleaning up temp logo {}: {}", path.display(), e);
            }
        }
    }
}

impl Drop for LogoGuard {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct InvoiceGenerator<R: Renderer, S: ContentStore> {
    renderer: R,
    store: S,
    work_dir: PathBuf,
}

impl<R: Renderer, S: ContentStore> InvoiceGenerator<R, S> {
    pub fn new(renderer: R, store: S, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            store,
            work_dir: work_dir.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn generate(
        &self,
        request: InvoiceRequest,
        ctx: &InvocationContext,
    ) -> Result<InvoiceResponse> {
        let span = tracing::info_span!("invoice", user_id = %ctx.user_id);
        self.run(request, ctx).instrument(span).await
    }

    async fn run(&self, request: InvoiceRequest, ctx: &InvocationContext) -> Result<InvoiceResponse> {
        let mut stage = StageTracker::new();

        stage.advance(Stage::Sanitizing);
        let fields = stage.check("sanitize", sanitize_fields(&request))?;

        stage.advance(Stage::Parsing);
        let doc = stage.check(
            "parse items",
            assemble_document(fields, request.items.as_deref().unwrap_or_default()),
        )?;
        tracing::debug!(
            "Invoice {} has {} items, total {}",
            doc.id,
            doc.items.len(),
            doc.total
        );

        let logo_fid = request.logo.as_ref().and_then(LogoReference::fid);
        let mut logo = LogoGuard {
            file: match logo_fid {
                Some(fid) => Some(stage.check("resolve logo", self.store.get_by_fid(fid).await)?),
                None => None,
            },
        };

        let output_path = self.work_dir.join(output_file_name(ctx));
        let args = stage.check("build args", build_args(&doc, &output_path, logo.path()))?;
        stage.advance(Stage::ArgsBuilt);
        tracing::debug!("Renderer arguments: {:?}", args);

        stage.advance(Stage::Invoking);
        let published = self
            .render_and_publish(&mut stage, &args, &output_path, &doc, ctx)
            .await;

        stage.advance(Stage::Cleaning);
        logo.release();
        remove_rendered_file(&output_path).await;

        let pdf = published?;
        stage.advance(Stage::Done);
        tracing::info!("✅ Invoice {} generated ({} bytes)", doc.id, pdf.size);

        Ok(InvoiceResponse {
            total: doc.total,
            item_total: doc.item_total,
            tax_total: doc.tax_total,
            json: doc,
            pdf,
        })
    }

    async fn render_and_publish(
        &self,
        stage: &mut StageTracker,
        args: &[String],
        output_path: &Path,
        doc: &InvoiceDocument,
        ctx: &InvocationContext,
    ) -> Result<RenderedArtifact> {
        stage.check("render", self.renderer.render(args, output_path).await)?;
        stage.advance(Stage::Invoked);

        stage.advance(Stage::Publishing);
        let read = tokio::fs::read(output_path).await.map_err(|e| {
            InvoiceError::render(format!(
                "rendered invoice not readable at {}: {}",
                output_path.display(),
                e
            ))
        });
        let bytes = stage.check("read rendered file", read)?;
        stage.check("publish", publish(&self.store, bytes, doc.pdf_file_name(), ctx).await)
    }
}

/// Publishes one file to the storage collaborator, tagging it with the caller.
pub async fn publish<S: ContentStore>(
    store: &S,
    data: Vec<u8>,
    file_name: String,
    ctx: &InvocationContext,
) -> Result<RenderedArtifact> {
    let options = PutOptions {
        mime_type: PDF_MIME_TYPE.to_string(),
        user_id: ctx.user_id.clone(),
        file_name,
    };
    let mut metadata = serde_json::Map::new();
    metadata.insert(
        "user".to_string(),
        serde_json::Value::String(ctx.user_id.clone()),
    );
    store.put_temp(data, options, metadata).await
}

fn output_file_name(ctx: &InvocationContext) -> String {
    // 以使用者 ID 與毫秒時間戳避免併發呼叫互相覆蓋
    let user: String = ctx
        .user_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    format!("{}{}.pdf", user, chrono::Utc::now().timestamp_millis())
}

async fn remove_rendered_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed rendered file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Error cleaning up temp file {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(items: &str, tax: f64) -> InvoiceRequest {
        InvoiceRequest {
            from: Some("A".to_string()),
            to: Some("B".to_string()),
            tax: Some(tax),
            items: Some(items.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_totals_are_exact() {
        let doc = build_document(&request("Consulting [100]", 0.08)).unwrap();
        assert_eq!(doc.item_total, Decimal::from(100));
        assert_eq!(doc.tax_total, Decimal::from(8));
        assert_eq!(doc.total, Decimal::from(108));
    }

    #[test]
    fn test_pen_example() {
        let doc = build_document(&request("1x Pen [1]", 0.1)).unwrap();
        assert_eq!(doc.total, Decimal::from_str("1.1").unwrap());
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["total"].as_f64(), Some(1.1));
        assert_eq!(json["items"][0]["itemName"], "Pen");
    }

    #[test]
    fn test_missing_required_fields() {
        for field in ["from", "to", "tax", "items"] {
            let mut req = request("Pen [1]", 0.0);
            match field {
                "from" => req.from = None,
                "to" => req.to = None,
                "tax" => req.tax = None,
                _ => req.items = None,
            }
            let err = build_document(&req).unwrap_err();
            assert!(err.is_validation());
            assert!(err.to_string().contains(field), "{}", err);
        }
    }

    #[test]
    fn test_blank_party_counts_as_missing() {
        let mut req = request("Pen [1]", 0.0);
        req.to = Some("   ".to_string());
        assert!(build_document(&req).unwrap_err().to_string().contains("'to'"));
    }

    #[test]
    fn test_tax_out_of_range() {
        assert!(build_document(&request("Pen [1]", 1.5)).is_err());
        assert!(build_document(&request("Pen [1]", -0.1)).is_err());
        assert!(build_document(&request("Pen [1]", f64::NAN)).is_err());
        assert!(build_document(&request("Pen [1]", 1.0)).is_ok());
    }

    #[test]
    fn test_id_defaults_to_today() {
        let mut req = request("Pen [1]", 0.0);
        req.id = Some("  ".to_string());
        let doc = build_document(&req).unwrap();
        assert_eq!(doc.id, chrono::Utc::now().format("%Y-%m-%d").to_string());
    }

    #[test]
    fn test_fields_are_sanitized() {
        let mut req = request("Pen [1]", 0.0);
        req.from = Some(" Smith & Sons ".to_string());
        req.note = Some("Pay by wire; thanks".to_string());
        let doc = build_document(&req).unwrap();
        assert_eq!(doc.from, "Smith \\& Sons");
        assert_eq!(doc.note.as_deref(), Some("Pay by wire\\; thanks"));
    }

    #[test]
    fn test_pdf_file_name() {
        let mut req = request("Pen [1]", 0.0);
        req.id = Some("42".to_string());
        let doc = build_document(&req).unwrap();
        assert_eq!(doc.pdf_file_name(), "Invoice - 42 - B.pdf");

        req.title = Some("Receipt".to_string());
        let doc = build_document(&req).unwrap();
        assert_eq!(doc.pdf_file_name(), "Receipt - 42 - B.pdf");
    }

    #[test]
    fn test_total_overflow_is_rejected() {
        let err = build_document(&request("Yacht [79228162514264337593543950335]", 1.0)).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("total too large"));

        assert!(build_document(&request("Yacht [79228162514264337593543950335]", 0.0)).is_ok());
    }

    #[test]
    fn test_sanitizing_does_not_parse_items() {
        let fields = sanitize_fields(&request("Mystery Item", 0.1)).unwrap();
        assert_eq!(fields.from, "A");

        let err = assemble_document(fields, "Mystery Item").unwrap_err();
        assert!(err.to_string().contains("rate missing"));
    }

    #[test]
    fn test_failed_stage_is_sticky() {
        let mut stage = StageTracker::new();
        stage.advance(Stage::Invoking);
        let result: Result<()> = stage.check("render", Err(InvoiceError::render("boom")));
        assert!(result.is_err());
        assert_eq!(stage.current, Stage::Failed);

        stage.advance(Stage::Cleaning);
        assert_eq!(stage.current, Stage::Failed);
    }

    #[test]
    fn test_stage_advances_until_failure() {
        let mut stage = StageTracker::new();
        stage.advance(Stage::Sanitizing);
        let value = stage.check("sanitize", Ok(1)).unwrap();
        assert_eq!(value, 1);
        stage.advance(Stage::Parsing);
        assert_eq!(stage.current, Stage::Parsing);
    }

    #[test]
    fn test_output_file_name_embeds_user() {
        let name = output_file_name(&InvocationContext::new("user/../1"));
        assert!(name.starts_with("user1"));
        assert!(name.ends_with(".pdf"));
    }
}
