pub mod generator;
pub mod invocation;
pub mod line_items;
pub mod sanitize;

pub use crate::domain::model::{InvoiceDocument, InvoiceRequest, InvoiceResponse, LineItem};
pub use crate::domain::ports::{ContentStore, Renderer};
pub use crate::utils::error::Result;
