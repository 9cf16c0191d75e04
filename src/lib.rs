pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::local_store::LocalContentStore;
pub use adapters::process_renderer::ProcessRenderer;
pub use config::toml_config::ComponentConfig;
pub use crate::core::generator::InvoiceGenerator;
pub use domain::descriptor::ComponentDescriptor;
pub use domain::model::{InvocationContext, InvoiceRequest, InvoiceResponse};
pub use utils::error::{InvoiceError, Result};
