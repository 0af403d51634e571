//! Payload serialization seam.
//!
//! Stores see payloads and task state as opaque text; the typed wrappers own
//! the conversion through a [`PayloadSerializer`].

use concord_core::{ConcordError, ConcordResult};
use serde::{de::DeserializeOwned, Serialize};

/// Converts typed values to and from stored text.
pub trait PayloadSerializer: Send + Sync + 'static {
    /// Serializes a value to text.
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> ConcordResult<String>;

    /// Deserializes a value from text.
    fn deserialize<T: DeserializeOwned>(&self, text: &str) -> ConcordResult<T>;
}

/// JSON serializer backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl PayloadSerializer for JsonSerializer {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> ConcordResult<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn deserialize<T: DeserializeOwned>(&self, text: &str) -> ConcordResult<T> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Attaches the id of the offending row to a serialization error.
pub(crate) fn for_row(err: ConcordError, id: impl ToString) -> ConcordError {
    match err {
        ConcordError::Serialization { reason, .. } => ConcordError::serialization(id, reason),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Invoice {
        number: u32,
        customer: String,
    }

    #[test]
    fn test_json_roundtrip() {
        let invoice = Invoice {
            number: 7,
            customer: "acme".to_string(),
        };
        let text = JsonSerializer.serialize(&invoice).unwrap();
        let back: Invoice = JsonSerializer.deserialize(&text).unwrap();
        assert_eq!(back, invoice);
    }

    #[test]
    fn test_malformed_payload_is_serialization_error() {
        let err = JsonSerializer.deserialize::<Invoice>("{\"number\":").unwrap_err();
        assert!(matches!(err, ConcordError::Serialization { id: None, .. }));
    }

    #[test]
    fn test_for_row_attaches_id() {
        let err = JsonSerializer.deserialize::<Invoice>("[]").unwrap_err();
        match for_row(err, "msg-1") {
            ConcordError::Serialization { id, .. } => assert_eq!(id.as_deref(), Some("msg-1")),
            other => panic!("Expected Serialization error, got {other:?}"),
        }
    }

    #[test]
    fn test_for_row_keeps_other_errors() {
        let err = for_row(ConcordError::internal("boom"), "msg-1");
        assert!(matches!(err, ConcordError::Internal(_)));
    }
}
