pub mod client;
pub mod error;
pub mod template;
pub mod types;

pub use client::ConnectClient;
pub use error::{ConnectError, Result};
pub use template::{TemplateRenderer, TemplateValues};
pub use types::*;
