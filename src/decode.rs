//! Decoding request data into typed values.
//!
//! Each function reads one part of a [`Request`] and deserializes it with
//! serde. The [`Context`](crate::Context) forwards to these; its `must_`
//! variants additionally answer `400 Bad Request` and stop the chain.
//!
//! | Function  | Source                                         | Codec                   |
//! |-----------|------------------------------------------------|-------------------------|
//! | [`body`]  | body, chosen by `Content-Type`                 | JSON / XML / urlencoded |
//! | [`form`]  | urlencoded body, then query string             | urlencoded              |
//! | [`query`] | query string                                   | urlencoded              |
//! | [`header`]| headers, keyed by lowercase name               | urlencoded              |
//!
//! A key given several times fills a sequence field (`Vec<T>`) with every
//! value, in order:
//!
//! ```rust
//! # use bytes::Bytes;
//! #[derive(serde::Deserialize)]
//! struct Filter {
//!     tag: Vec<String>,
//! }
//!
//! let req: strand::Request = http::Request::builder()
//!     .uri("/items?tag=a&tag=b")
//!     .body(Bytes::new())
//!     .unwrap()
//!     .into();
//! let filter: Filter = strand::decode::query(&req).unwrap();
//! assert_eq!(filter.tag, ["a", "b"]);
//! ```
//!
//! Decoded values can be checked afterwards with [`validate`].

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::request::Request;

pub const MIME_JSON: &str = "application/json";
pub const MIME_XML: &str = "application/xml";
pub const MIME_TEXT_XML: &str = "text/xml";
pub const MIME_FORM: &str = "application/x-www-form-urlencoded";

/// Why request data could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// No decoder handles the request's `Content-Type`.
    #[error("unknown content type `{0}`")]
    UnknownContentType(String),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("form: {0}")]
    Form(#[from] serde::de::value::Error),

    /// The value decoded but failed its validation rules.
    #[error("invalid: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// Decodes the body with the decoder selected by `Content-Type`.
pub fn body<T: DeserializeOwned>(req: &Request) -> Result<T, DecodeError> {
    match mime(req) {
        MIME_JSON => Ok(serde_json::from_slice(req.body())?),
        MIME_XML | MIME_TEXT_XML => Ok(quick_xml::de::from_reader(req.body())?),
        MIME_FORM => Ok(serde_html_form::from_bytes(req.body())?),
        other => Err(DecodeError::UnknownContentType(other.to_owned())),
    }
}

/// Decodes the urlencoded body (when the request carries one) merged with
/// the query string. A key present in the body shadows every query value of
/// the same key.
pub fn form<T: DeserializeOwned>(req: &Request) -> Result<T, DecodeError> {
    let query = req.query().unwrap_or("");
    if mime(req) != MIME_FORM {
        return Ok(serde_html_form::from_str(query)?);
    }

    let body: Vec<_> = form_urlencoded::parse(req.body()).collect();
    let shadowed: HashSet<_> = body.iter().map(|(key, _)| key.clone()).collect();
    let from_query = form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| !shadowed.contains(key));
    let merged = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(body.iter().cloned().chain(from_query))
        .finish();
    Ok(serde_html_form::from_str(&merged)?)
}

/// Decodes the query string.
pub fn query<T: DeserializeOwned>(req: &Request) -> Result<T, DecodeError> {
    Ok(serde_html_form::from_str(req.query().unwrap_or(""))?)
}

/// Decodes the headers. Field names are the lowercase header names, so use
/// `#[serde(rename = "user-agent")]` and the like. A header sent several
/// times fills a `Vec` field.
pub fn header<T: DeserializeOwned>(req: &Request) -> Result<T, DecodeError> {
    let pairs = req.headers().iter().filter_map(|(name, value)| {
        Some((name.as_str(), value.to_str().ok()?))
    });
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    Ok(serde_html_form::from_str(&encoded)?)
}

/// Runs the `validator` rules of a decoded value, handing it back when they
/// all pass.
///
/// ```rust
/// use validator::Validate;
///
/// #[derive(Validate)]
/// struct Signup {
///     #[validate(length(min = 3))]
///     name: String,
/// }
///
/// assert!(strand::decode::validate(Signup { name: "al".into() }).is_err());
/// ```
pub fn validate<T: Validate>(value: T) -> Result<T, DecodeError> {
    value.validate()?;
    Ok(value)
}

/// Media type without parameters: `application/json; charset=utf-8` → `application/json`.
fn mime(req: &Request) -> &str {
    req.header(http::header::CONTENT_TYPE.as_str())
        .and_then(|ct| ct.split(';').next())
        .map_or("", str::trim)
}
