use crate::domain::model::InvoiceDocument;
use crate::utils::error::{InvoiceError, Result};
use std::path::Path;

pub const SUBCOMMAND: &str = "generate";

/// Budget for the output file name plus the space-joined argument list.
pub const MAX_COMMAND_LENGTH: usize = 8192;

/// Renderer argv (without the binary itself), in the order the renderer expects:
///
/// ```text
/// generate [--note V] --from V --to V (--item V --quantity N --rate N)* [--id V]
///          [--title V] --tax N [--currency V] [--due V] [--logo PATH] --output PATH
/// ```
pub fn build_args(
    doc: &InvoiceDocument,
    output_path: &Path,
    logo_path: Option<&Path>,
) -> Result<Vec<String>> {
    let mut args = vec![SUBCOMMAND.to_string()];

    push_optional(&mut args, "--note", doc.note.as_deref());
    push_flag(&mut args, "--from", &doc.from);
    push_flag(&mut args, "--to", &doc.to);

    for item in &doc.items {
        push_flag(&mut args, "--item", &item.item_name);
        push_flag(&mut args, "--quantity", &item.quantity.to_string());
        push_flag(&mut args, "--rate", &item.rate.normalize().to_string());
    }

    push_optional(&mut args, "--id", Some(doc.id.as_str()));
    push_optional(&mut args, "--title", doc.title.as_deref());
    push_flag(&mut args, "--tax", &doc.tax.normalize().to_string());
    push_optional(&mut args, "--currency", doc.currency.as_deref());
    push_optional(&mut args, "--due", doc.due.as_deref());

    if let Some(logo) = logo_path {
        push_flag(&mut args, "--logo", &logo.to_string_lossy());
    }

    push_flag(&mut args, "--output", &output_path.to_string_lossy());

    check_command_length(output_path, &args)?;
    Ok(args)
}

fn push_flag(args: &mut Vec<String>, flag: &str, value: &str) {
    args.push(flag.to_string());
    args.push(value.to_string());
}

fn push_optional(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        push_flag(args, flag, value);
    }
}

fn check_command_length(output_path: &Path, args: &[String]) -> Result<()> {
    let file_name_len = output_path
        .file_name()
        .map(|name| name.to_string_lossy().chars().count())
        .unwrap_or(0);
    let joined_len = args.join(" ").chars().count();

    if file_name_len + joined_len > MAX_COMMAND_LENGTH {
        tracing::warn!(
            "Renderer command too long: {} characters (limit {})",
            file_name_len + joined_len,
            MAX_COMMAND_LENGTH
        );
        return Err(InvoiceError::input_too_long());
    }
    Ok(())
}
