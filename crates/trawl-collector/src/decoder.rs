//! Captured payload to result page decoding.
//!
//! The search API answers with an envelope like
//!
//! ```json
//! {"code": 0, "message": "Success",
//!  "zpData": {"jobList": [...], "totalCount": 300, "hasMore": true}}
//! ```
//!
//! Field names and the success/throttle codes come from [`PayloadLayout`].

use crate::error::DecodeError;
use serde_json::Value;
use trawl_core::{Payload, PayloadLayout, ResponsePacket};

/// Message reported when a failed response carries none.
const DEFAULT_FAILURE_MESSAGE: &str = "search failed";

/// Decoded view of one successful search response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    /// Status code as sent by the site
    pub code: i64,
    /// Raw records, in the order the site listed them
    pub records: Vec<Value>,
    /// Declared total match count; only meaningful on the first page
    pub total_count: Option<u64>,
    /// Whether the site reports further pages
    pub has_more: bool,
}

impl ResultPage {
    /// Page with no records and nothing further to load.
    #[must_use]
    pub fn empty(code: i64) -> Self {
        Self {
            code,
            records: Vec::new(),
            total_count: None,
            has_more: false,
        }
    }
}

/// Classification of a decoded response.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// Status code matched the success code
    Success(ResultPage),
    /// Status code matched the throttle code
    Throttled {
        /// Code the site sent
        code: i64,
    },
    /// Any other status code
    OtherFailure {
        /// Code the site sent
        code: i64,
        /// Site-provided message
        message: String,
    },
}

/// Turns captured packets into [`DecodeOutcome`]s.
#[derive(Debug, Clone, Default)]
pub struct ResponseDecoder {
    layout: PayloadLayout,
}

impl ResponseDecoder {
    /// Create a decoder for the given payload layout.
    #[must_use]
    pub fn new(layout: PayloadLayout) -> Self {
        Self { layout }
    }

    /// Decode one captured packet.
    ///
    /// # Errors
    /// Returns [`DecodeError`] when the body is not UTF-8 JSON, lacks a
    /// numeric status code, or has a record list that is not an array.
    pub fn decode(&self, packet: &ResponsePacket) -> Result<DecodeOutcome, DecodeError> {
        let document: Value = match packet.payload() {
            Payload::Text(text) => serde_json::from_str(text)?,
            Payload::Bytes(bytes) => serde_json::from_str(std::str::from_utf8(bytes)?)?,
        };
        self.decode_value(&document)
    }

    /// Decode an already parsed response document.
    pub fn decode_value(&self, document: &Value) -> Result<DecodeOutcome, DecodeError> {
        let layout = &self.layout;
        let code = document
            .get(&layout.code_field)
            .and_then(as_code)
            .ok_or_else(|| DecodeError::MissingCode(layout.code_field.clone()))?;

        if code == layout.throttle_code {
            return Ok(DecodeOutcome::Throttled { code });
        }

        if code != layout.success_code {
            let message = document
                .get(&layout.message_field)
                .and_then(Value::as_str)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(DEFAULT_FAILURE_MESSAGE)
                .to_string();
            return Ok(DecodeOutcome::OtherFailure { code, message });
        }

        let data = match document.get(&layout.data_field) {
            None | Some(Value::Null) => return Ok(DecodeOutcome::Success(ResultPage::empty(code))),
            Some(data) => data,
        };

        let records = match data.get(&layout.records_field) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                return Err(DecodeError::Shape {
                    field: layout.records_field.clone(),
                    expected: "an array",
                })
            }
        };

        Ok(DecodeOutcome::Success(ResultPage {
            code,
            records,
            total_count: data.get(&layout.total_field).and_then(Value::as_u64),
            has_more: data
                .get(&layout.has_more_field)
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }))
    }
}

/// Status codes are numbers, but some gateways send them as strings.
fn as_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
