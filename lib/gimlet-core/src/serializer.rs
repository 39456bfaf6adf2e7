//! Body serializers.
//!
//! A [`Serializer`] encodes a structured [`Value`] into a [`Payload`] and
//! decodes response bytes back into a [`Value`] according to their content
//! type. [`SmartSerializer`] negotiates between several registered codecs and
//! is the default used by client builders.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Content types understood by the built-in serializers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain`).
    PlainText,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Media type without parameters, lower-cased: `Application/JSON; charset=utf-8` → `application/json`.
#[must_use]
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Encoded body with the content type it was encoded as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Negotiated content type.
    pub content_type: String,
    /// Wire bytes.
    pub bytes: Bytes,
}

impl Payload {
    /// Create a payload.
    #[must_use]
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// Encodes request bodies and decodes response bodies.
pub trait Serializer: fmt::Debug + Send + Sync + 'static {
    /// Media types this serializer handles, most preferred first.
    fn media_types(&self) -> Vec<&str>;

    /// Returns `true` if this serializer handles the given content type.
    fn handles(&self, content_type: &str) -> bool {
        let essence = essence(content_type);
        self.media_types().iter().any(|media| *media == essence)
    }

    /// Value for the `Accept` header of outgoing requests.
    fn accept(&self) -> String {
        self.media_types().join(", ")
    }

    /// Encode a structured value.
    ///
    /// `content_type` is the per-request preference, if any; `None` lets the
    /// serializer choose.
    fn serialize(&self, value: &Value, content_type: Option<&str>) -> Result<Payload>;

    /// Decode response bytes of the given content type.
    fn deserialize(&self, bytes: &[u8], content_type: Option<&str>) -> Result<Value>;
}

fn unsupported(content_type: &str) -> Error {
    Error::encoding(content_type, "no serializer registered for this content type")
}

// ============================================================================
// JSON
// ============================================================================

/// JSON serializer. Also decodes structured syntax suffixes such as
/// `application/problem+json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn media_types(&self) -> Vec<&str> {
        vec![ContentType::Json.as_str()]
    }

    fn handles(&self, content_type: &str) -> bool {
        let essence = essence(content_type);
        essence == ContentType::Json.as_str() || essence.ends_with("+json")
    }

    fn serialize(&self, value: &Value, content_type: Option<&str>) -> Result<Payload> {
        let content_type = content_type.unwrap_or(ContentType::Json.as_str());
        if !self.handles(content_type) {
            return Err(unsupported(content_type));
        }
        let bytes =
            serde_json::to_vec(value).map_err(|e| Error::encoding(content_type, e.to_string()))?;
        Ok(Payload::new(content_type, bytes))
    }

    fn deserialize(&self, bytes: &[u8], content_type: Option<&str>) -> Result<Value> {
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(bytes).map_err(|e| {
            Error::encoding(
                content_type.unwrap_or(ContentType::Json.as_str()),
                e.to_string(),
            )
        })
    }
}

// ============================================================================
// Form URL-encoded
// ============================================================================

/// `application/x-www-form-urlencoded` serializer.
///
/// Only flat objects are encodable: scalars become single fields, arrays of
/// scalars become repeated fields (`tags=a&tags=b`). Decoding folds repeated
/// fields back into arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormSerializer;

fn form_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

impl Serializer for FormSerializer {
    fn media_types(&self) -> Vec<&str> {
        vec![ContentType::FormUrlEncoded.as_str()]
    }

    fn serialize(&self, value: &Value, _content_type: Option<&str>) -> Result<Payload> {
        let content_type = ContentType::FormUrlEncoded.as_str();
        let Value::Object(fields) = value else {
            return Err(Error::encoding(content_type, "form bodies must be objects"));
        };

        let mut pairs = Vec::with_capacity(fields.len());
        for (name, field) in fields {
            let values = match field {
                Value::Array(items) => items.iter().map(form_scalar).collect::<Option<Vec<_>>>(),
                other => form_scalar(other).map(|value| vec![value]),
            }
            .ok_or_else(|| {
                Error::encoding(content_type, format!("field {name:?} is not a flat value"))
            })?;
            pairs.extend(values.into_iter().map(|value| (name.clone(), value)));
        }

        let encoded = serde_html_form::to_string(&pairs)
            .map_err(|e| Error::encoding(content_type, e.to_string()))?;
        Ok(Payload::new(content_type, encoded.into_bytes()))
    }

    fn deserialize(&self, bytes: &[u8], _content_type: Option<&str>) -> Result<Value> {
        let pairs: Vec<(String, String)> = serde_html_form::from_bytes(bytes)
            .map_err(|e| Error::encoding(ContentType::FormUrlEncoded.as_str(), e.to_string()))?;

        let mut fields = Map::new();
        for (name, value) in pairs {
            match fields.get_mut(&name) {
                Some(Value::Array(values)) => values.push(Value::String(value)),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, Value::String(value)]);
                }
                None => {
                    fields.insert(name, Value::String(value));
                }
            }
        }
        Ok(Value::Object(fields))
    }
}

// ============================================================================
// Plain text
// ============================================================================

/// `text/plain` serializer for scalar bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSerializer;

impl Serializer for TextSerializer {
    fn media_types(&self) -> Vec<&str> {
        vec![ContentType::PlainText.as_str()]
    }

    fn handles(&self, content_type: &str) -> bool {
        essence(content_type).starts_with("text/")
    }

    fn serialize(&self, value: &Value, content_type: Option<&str>) -> Result<Payload> {
        let content_type = content_type.unwrap_or(ContentType::PlainText.as_str());
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => {
                return Err(Error::encoding(
                    content_type,
                    "text bodies must be scalar values",
                ));
            }
        };
        Ok(Payload::new(content_type, text.into_bytes()))
    }

    fn deserialize(&self, bytes: &[u8], content_type: Option<&str>) -> Result<Value> {
        String::from_utf8(bytes.to_vec())
            .map(Value::String)
            .map_err(|e| {
                Error::encoding(
                    content_type.unwrap_or(ContentType::PlainText.as_str()),
                    e.to_string(),
                )
            })
    }
}

// ============================================================================
// Smart (negotiating) serializer
// ============================================================================

/// Serializer negotiating between registered codecs.
///
/// - Encoding: a requested content type selects the first codec handling it;
///   otherwise string bodies go to a `text/*` codec when one is registered and
///   everything else goes to the first registered codec.
/// - Decoding: the response content type selects the codec. Without a usable
///   content type, JSON is sniffed first and UTF-8 text is the fallback.
///   An empty body decodes to `null`.
///
/// # Example
///
/// ```
/// use gimlet_core::{Serializer, SmartSerializer};
/// use serde_json::json;
///
/// let serializer = SmartSerializer::default();
/// let payload = serializer.serialize(&json!({"ok": true}), None).expect("encode");
///
/// assert_eq!(payload.content_type, "application/json");
/// assert_eq!(
///     serializer.deserialize(&payload.bytes, Some("application/json")).expect("decode"),
///     json!({"ok": true})
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SmartSerializer {
    codecs: Vec<Arc<dyn Serializer>>,
}

impl Default for SmartSerializer {
    fn default() -> Self {
        Self::empty()
            .with(JsonSerializer)
            .with(FormSerializer)
            .with(TextSerializer)
    }
}

impl SmartSerializer {
    /// A serializer with no codec registered.
    #[must_use]
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Register a codec; earlier registrations take precedence.
    #[must_use]
    pub fn with(mut self, codec: impl Serializer) -> Self {
        self.codecs.push(Arc::new(codec));
        self
    }

    fn codec_for(&self, content_type: &str) -> Option<&Arc<dyn Serializer>> {
        self.codecs.iter().find(|codec| codec.handles(content_type))
    }

    /// Decode a body no codec claims: JSON if it parses, text otherwise.
    fn sniff(bytes: &[u8], content_type: Option<&str>) -> Result<Value> {
        if let Ok(value) = serde_json::from_slice(bytes) {
            return Ok(value);
        }
        String::from_utf8(bytes.to_vec()).map(Value::String).map_err(|e| {
            Error::encoding(
                content_type.unwrap_or("application/octet-stream"),
                e.to_string(),
            )
        })
    }
}

impl Serializer for SmartSerializer {
    fn media_types(&self) -> Vec<&str> {
        self.codecs
            .iter()
            .flat_map(|codec| codec.media_types())
            .collect()
    }

    fn handles(&self, content_type: &str) -> bool {
        self.codec_for(content_type).is_some()
    }

    fn serialize(&self, value: &Value, content_type: Option<&str>) -> Result<Payload> {
        if let Some(content_type) = content_type {
            return self
                .codec_for(content_type)
                .ok_or_else(|| unsupported(content_type))?
                .serialize(value, Some(content_type));
        }

        let codec = match value {
            Value::String(_) => self
                .codec_for(ContentType::PlainText.as_str())
                .or_else(|| self.codecs.first()),
            _ => self.codecs.first(),
        }
        .ok_or_else(|| unsupported("*/*"))?;

        codec.serialize(value, None)
    }

    fn deserialize(&self, bytes: &[u8], content_type: Option<&str>) -> Result<Value> {
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        match content_type.and_then(|content_type| self.codec_for(content_type)) {
            Some(codec) => codec.deserialize(bytes, content_type),
            None => Self::sniff(bytes, content_type),
        }
    }
}

// ============================================================================
// Typed conversion
// ============================================================================

/// Convert a decoded value into a typed value with path-aware error messages.
///
/// Uses `serde_path_to_error` so the error names the exact field that failed
/// (e.g. `owner.address.city`).
///
/// # Errors
///
/// Returns an [`Error::Encoding`] if the value does not match `T`.
///
/// # Example
///
/// ```
/// use gimlet_core::from_value;
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct User { name: String }
///
/// let user: User = from_value(json!({"name": "Alice"})).expect("deserialize");
/// assert_eq!(user, User { name: "Alice".to_string() });
/// ```
pub fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        Error::encoding(
            ContentType::Json.as_str(),
            format!("at '{}': {}", e.path(), e.inner()),
        )
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn essence_strips_parameters_and_case() {
        assert_eq!(essence("Application/JSON; charset=utf-8"), "application/json");
        assert_eq!(essence("text/plain"), "text/plain");
    }

    #[test]
    fn json_round_trip() {
        let value = json!({"name": "Alice", "tags": ["a", "b"], "age": 30});
        let payload = JsonSerializer.serialize(&value, None).expect("encode");

        assert_eq!(payload.content_type, "application/json");
        assert_eq!(
            JsonSerializer
                .deserialize(&payload.bytes, Some(&payload.content_type))
                .expect("decode"),
            value
        );
    }

    #[test]
    fn json_handles_suffix_types() {
        assert!(JsonSerializer.handles("application/problem+json"));
        assert!(JsonSerializer.handles("application/json; charset=utf-8"));
        assert!(!JsonSerializer.handles("text/plain"));
    }

    #[test]
    fn json_rejects_foreign_content_type() {
        let err = JsonSerializer
            .serialize(&json!({}), Some("text/csv"))
            .expect_err("unsupported");
        assert!(err.is_encoding());
    }

    #[test]
    fn json_decode_error_carries_content_type() {
        let err = JsonSerializer
            .deserialize(b"not json", Some("application/json"))
            .expect_err("invalid");
        assert!(matches!(
            err,
            Error::Encoding { ref content_type, .. } if content_type == "application/json"
        ));
    }

    #[test]
    fn form_encodes_flat_objects_with_repeated_fields() {
        let payload = FormSerializer
            .serialize(&json!({"name": "test", "tags": ["rust", "http"]}), None)
            .expect("encode");
        let text = String::from_utf8(payload.bytes.to_vec()).expect("utf8");

        assert_eq!(payload.content_type, "application/x-www-form-urlencoded");
        assert!(text.contains("name=test"));
        assert!(text.contains("tags=rust"));
        assert!(text.contains("tags=http"));
    }

    #[test]
    fn form_rejects_nested_objects() {
        let err = FormSerializer
            .serialize(&json!({"owner": {"name": "x"}}), None)
            .expect_err("nested");
        assert!(err.is_encoding());

        let err = FormSerializer
            .serialize(&json!(["a"]), None)
            .expect_err("not an object");
        assert!(err.is_encoding());
    }

    #[test]
    fn form_decode_folds_repeated_fields() {
        let value = FormSerializer
            .deserialize(b"name=test&tags=a&tags=b&tags=c", None)
            .expect("decode");
        assert_eq!(value, json!({"name": "test", "tags": ["a", "b", "c"]}));
    }

    #[test]
    fn text_serializes_scalars_only() {
        let payload = TextSerializer.serialize(&json!("hello"), None).expect("encode");
        assert_eq!(payload.bytes.as_ref(), b"hello");
        assert_eq!(payload.content_type, "text/plain");

        assert!(TextSerializer.serialize(&json!({"a": 1}), None).is_err());
    }

    #[test]
    fn smart_picks_json_for_structures_and_text_for_strings() {
        let smart = SmartSerializer::default();

        let payload = smart.serialize(&json!({"a": 1}), None).expect("json");
        assert_eq!(payload.content_type, "application/json");

        let payload = smart.serialize(&json!("raw"), None).expect("text");
        assert_eq!(payload.content_type, "text/plain");
        assert_eq!(payload.bytes.as_ref(), b"raw");
    }

    #[test]
    fn smart_honors_requested_content_type() {
        let smart = SmartSerializer::default();
        let payload = smart
            .serialize(
                &json!({"user": "alice"}),
                Some("application/x-www-form-urlencoded"),
            )
            .expect("form");

        assert_eq!(payload.bytes.as_ref(), b"user=alice");

        let err = smart
            .serialize(&json!({}), Some("application/xml"))
            .expect_err("unsupported");
        assert!(err.is_encoding());
    }

    #[test]
    fn smart_decodes_by_content_type() {
        let smart = SmartSerializer::default();

        assert_eq!(
            smart
                .deserialize(br#"{"ok":true}"#, Some("application/json; charset=utf-8"))
                .expect("json"),
            json!({"ok": true})
        );
        assert_eq!(
            smart.deserialize(b"a=1", Some("application/x-www-form-urlencoded")).expect("form"),
            json!({"a": "1"})
        );
        assert_eq!(
            smart.deserialize(b"{not json", Some("text/html")).expect("text"),
            json!("{not json")
        );
    }

    #[test]
    fn smart_sniffs_without_content_type() {
        let smart = SmartSerializer::default();

        assert_eq!(smart.deserialize(b"[1,2]", None).expect("json"), json!([1, 2]));
        assert_eq!(smart.deserialize(b"plain words", None).expect("text"), json!("plain words"));
        assert_eq!(smart.deserialize(b"", Some("application/json")).expect("empty"), Value::Null);
        assert!(smart.deserialize(&[0xff, 0xfe], None).is_err());
    }

    #[test]
    fn smart_binary_body_error_names_declared_type() {
        let err = SmartSerializer::default()
            .deserialize(&[0xff, 0xd8, 0xff], Some("image/jpeg"))
            .expect_err("not text");
        assert!(matches!(
            err,
            Error::Encoding { ref content_type, .. } if content_type == "image/jpeg"
        ));

        let err = SmartSerializer::default()
            .deserialize(&[0xff, 0xfe], None)
            .expect_err("not text");
        assert!(matches!(
            err,
            Error::Encoding { ref content_type, .. } if content_type == "application/octet-stream"
        ));
    }

    #[test]
    fn smart_accept_lists_every_codec() {
        assert_eq!(
            SmartSerializer::default().accept(),
            "application/json, application/x-www-form-urlencoded, text/plain"
        );
    }

    #[test]
    fn empty_smart_serializer_cannot_encode() {
        let err = SmartSerializer::empty()
            .serialize(&json!({}), None)
            .expect_err("no codec");
        assert!(err.is_encoding());
    }
}
