//! Configuration loading and validation
//!
//! Concrete configuration types live in the application crate; this module
//! provides the load/merge/validate contract they share.

mod traits;
mod validation;

pub use traits::{parse_override, ClientConfig};
pub use validation::{ConfigValidator, ValidationError, ValidationResult};
