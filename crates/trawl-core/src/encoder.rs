//! Query-parameter encoding seam.
//!
//! The site expects opaque codes (`101010100`, `203`) instead of the
//! human-readable filter values a caller supplies. Implementations resolve
//! one value at a time and return `None` when no code is known, in which case
//! the filter is simply omitted from the request.

use crate::types::FilterField;

/// Translate a human-readable filter value into the site's code.
pub trait QueryEncoder: Send + Sync {
    /// Look up the code for `value` in the table for `field`.
    fn encode(&self, field: FilterField, value: &str) -> Option<String>;
}

/// Encoder that knows no codes; every filter is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCodes;

impl QueryEncoder for NoCodes {
    fn encode(&self, _field: FilterField, _value: &str) -> Option<String> {
        None
    }
}
