//! Common types shared by the Salesforce client crates

mod argument;
mod error;
mod secret;

pub use argument::{ArgumentError, require_absolute_url, require_non_blank};
pub use error::{Error, Result};
pub use secret::Secret;
