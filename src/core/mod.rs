//! Core module - shared errors and paths

mod error;
pub mod paths;

pub use error::{Result, UpmonError, format_error_with_suggestion};
