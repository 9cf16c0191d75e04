//! Free-text line items: `[<quantity>x ]<name> [<rate>]`, one per line.
//!
//! ```text
//! 10x Rubber Duck [$ 25]
//! Widget [10]
//! 2x Gadget [5.50]
//! ```

use crate::core::sanitize::sanitize_str;
use crate::domain::model::LineItem;
use crate::utils::error::{InvoiceError, Result};
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

const QUANTITY_SEPARATOR: &str = "x ";

// 第一個 `[` 到下一個 `]`
static RATE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("rate segment pattern"));

static RATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+(?:\.\d*)?|\.\d+)").expect("rate prefix pattern"));

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItems {
    pub item_total: Decimal,
    pub line_items: Vec<LineItem>,
}

pub fn parse_items(text: &str) -> Result<ParsedItems> {
    let mut item_total = Decimal::ZERO;
    let mut line_items = Vec::new();

    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        let item = parse_line(line)?;
        item_total = item
            .amount()
            .and_then(|amount| item_total.checked_add(amount))
            .ok_or_else(|| {
                InvoiceError::validation(format!("amount too large in item {}", item.item_name))
            })?;
        line_items.push(item);
    }

    if line_items.is_empty() {
        return Err(InvoiceError::validation(
            "items must contain at least one line item",
        ));
    }

    tracing::debug!(
        "Parsed {} line items, item total {}",
        line_items.len(),
        item_total
    );

    Ok(ParsedItems {
        item_total,
        line_items,
    })
}

pub fn parse_line(line: &str) -> Result<LineItem> {
    let (quantity, item_text) = match line.split_once(QUANTITY_SEPARATOR) {
        Some((left, right)) => (parse_quantity(left, line)?, right),
        None => (1, line),
    };

    let Some((segment, inner)) = RATE_SEGMENT
        .captures(item_text)
        .and_then(|caps| Some((caps.get(0)?, caps.get(1)?)))
    else {
        return Err(InvoiceError::validation(format!(
            "rate missing from item {}",
            item_text.trim()
        )));
    };

    let name_without_rate = format!(
        "{}{}",
        &item_text[..segment.start()],
        &item_text[segment.end()..]
    );
    let rate = parse_rate(inner.as_str(), name_without_rate.trim())?;
    let item_name = sanitize_str(&name_without_rate)?;

    Ok(LineItem {
        quantity,
        item_name,
        rate,
    })
}

fn parse_quantity(raw: &str, line: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(quantity) if quantity > 0 => Ok(quantity),
        _ => Err(InvoiceError::validation(format!(
            "invalid quantity in item {}",
            line.trim()
        ))),
    }
}

/// Keeps digits, `.` and `,`, then reads the leading decimal number (`1,000` reads as 1).
fn parse_rate(raw: &str, item_name: &str) -> Result<Decimal> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    RATE_PREFIX
        .find(&digits)
        .map(|m| m.as_str().trim_end_matches('.'))
        .and_then(|number| match number.strip_prefix('.') {
            Some(fraction) => Decimal::from_str(&format!("0.{}", fraction)).ok(),
            None => Decimal::from_str(number).ok(),
        })
        .ok_or_else(|| InvoiceError::validation(format!("invalid rate in item {}", item_name)))
}
