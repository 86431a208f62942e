//! Browser session driver for JavaScript-rendered search pages.
//!
//! Provides headless browser control with anti-fingerprinting and capture of
//! the JSON responses a page fetches for itself.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;
mod intercept;

pub use actions::SessionDriver;
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
