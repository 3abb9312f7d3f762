//! Per-request context.
//!
//! A [`Context`] is created by [`Wrapped::call`](crate::Wrapped::call) for
//! every request and handed by `&mut` to each middleware and to the terminal
//! handler. It owns the request, the response being built, and the `stopped`
//! flag that halts the chain.
//!
//! # Write-once status
//!
//! The first status write freezes the status and the headers, whether it is
//! explicit ([`write_status`](Context::write_status), [`code`](Context::code))
//! or implied by the first body write. Later status writes are ignored and
//! logged at WARN; body writes keep appending.

use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use http::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;
use validator::Validate;

use crate::decode::{self, DecodeError};
use crate::error::Error;
use crate::request::Request;
use crate::response::{IntoResponse, JSON, Response, TEXT};

/// Marks a request that already has a context attached.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Attached;

/// Reports whether a context has already been attached to `req`.
///
/// Every request seen by a middleware or a terminal handler returns `true`.
///
/// There is no lookup from a request to its context: the context itself is
/// handed by `&mut` to every middleware and handler. A [`Request`] cloned out
/// of it keeps the mark, which is how [`Wrapped::call`](crate::Wrapped::call)
/// refuses nested chains.
pub fn attached(req: &Request) -> bool {
    req.extensions().get::<Attached>().is_some()
}

/// State carried through one request's middleware chain.
pub struct Context {
    request: Request,
    response: Response,
    status_written: bool,
    stopped: bool,
}

impl Context {
    pub(crate) fn new(mut request: Request) -> Self {
        request.extensions_mut().insert(Attached);
        Self {
            request,
            response: Response::default(),
            status_written: false,
            stopped: false,
        }
    }

    // ── Chain control ─────────────────────────────────────────────────────────

    /// Stops further middleware processing.
    ///
    /// Code already running, including the caller's own code after this
    /// call, is unaffected. Only the next step of the chain is suppressed.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    // ── Request ───────────────────────────────────────────────────────────────

    pub fn request(&self) -> &Request { &self.request }
    pub fn request_mut(&mut self) -> &mut Request { &mut self.request }

    /// Stores a request-scoped value, replacing any previous value of the
    /// same type.
    pub fn set_value<T: Clone + Send + Sync + 'static>(&mut self, value: T) {
        self.request.extensions_mut().insert(value);
    }

    pub fn value<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.request.extensions().get::<T>()
    }

    pub fn decode_body<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        decode::body(&self.request)
    }

    pub fn decode_form<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        decode::form(&self.request)
    }

    pub fn decode_header<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        decode::header(&self.request)
    }

    pub fn decode_query<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        decode::query(&self.request)
    }

    /// Like [`decode_body`](Self::decode_body), but on failure also answers
    /// `400 Bad Request` and stops the chain.
    pub fn must_decode_body<T: DeserializeOwned>(&mut self) -> Result<T, DecodeError> {
        let res = self.decode_body();
        self.reject_on_err(res)
    }

    pub fn must_decode_form<T: DeserializeOwned>(&mut self) -> Result<T, DecodeError> {
        let res = self.decode_form();
        self.reject_on_err(res)
    }

    pub fn must_decode_header<T: DeserializeOwned>(&mut self) -> Result<T, DecodeError> {
        let res = self.decode_header();
        self.reject_on_err(res)
    }

    pub fn must_decode_query<T: DeserializeOwned>(&mut self) -> Result<T, DecodeError> {
        let res = self.decode_query();
        self.reject_on_err(res)
    }

    /// Checks a decoded value with [`decode::validate`]; on failure answers
    /// `400 Bad Request` and stops the chain.
    pub fn must_validate<T: Validate>(&mut self, value: T) -> Result<T, DecodeError> {
        let res = decode::validate(value);
        self.reject_on_err(res)
    }

    fn reject_on_err<T>(&mut self, res: Result<T, DecodeError>) -> Result<T, DecodeError> {
        if res.is_err() {
            self.code(StatusCode::BAD_REQUEST);
            self.stop();
        }
        res
    }

    // ── Response ──────────────────────────────────────────────────────────────

    pub fn response(&self) -> &Response { &self.response }

    /// Response headers, or `None` once the status has been written.
    pub fn headers_mut(&mut self) -> Option<&mut HeaderMap> {
        if self.status_written {
            None
        } else {
            Some(&mut self.response.headers)
        }
    }

    pub fn status_written(&self) -> bool {
        self.status_written
    }

    /// Writes the status. Only the first write takes effect.
    pub fn write_status(&mut self, code: StatusCode) {
        if self.status_written {
            warn!(
                current = self.response.status.as_u16(),
                ignored = code.as_u16(),
                "superfluous status write"
            );
            return;
        }
        self.response.status = code;
        self.status_written = true;
    }

    /// Appends to the body, writing `200 OK` first if no status was written.
    pub fn write(&mut self, data: &[u8]) {
        if !self.status_written {
            self.write_status(StatusCode::OK);
        }
        self.response.body.extend_from_slice(data);
    }

    /// Writes `code` with its canonical reason as a plain-text body.
    pub fn code(&mut self, code: StatusCode) {
        if let Some(headers) = self.headers_mut() {
            headers.remove(http::header::CONTENT_LENGTH);
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT));
            headers.insert(
                http::header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
        }
        self.write_status(code);
        let reason = code.canonical_reason().unwrap_or("");
        self.write(format!("{reason}\n").as_bytes());
    }

    pub fn string(&mut self, body: &str) {
        self.write(body.as_bytes());
    }

    pub fn string_response(&mut self, code: StatusCode, body: &str) {
        self.write_status(code);
        self.write(body.as_bytes());
    }

    /// Writes the JSON encoding of `value`, setting `Content-Type` when the
    /// headers are still writable and none is set.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        let bytes = serde_json::to_vec(value)?;
        if let Some(headers) = self.headers_mut() {
            headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(JSON));
        }
        self.write(&bytes);
        Ok(())
    }

    pub fn json_response<T: Serialize + ?Sized>(
        &mut self,
        code: StatusCode,
        value: &T,
    ) -> Result<(), Error> {
        let bytes = serde_json::to_vec(value)?;
        if let Some(headers) = self.headers_mut() {
            headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(JSON));
        }
        self.write_status(code);
        self.write(&bytes);
        Ok(())
    }

    /// Writes a complete response: its headers (while still writable), its
    /// status, then its body.
    pub fn respond(&mut self, res: impl IntoResponse) {
        let res = res.into_response();
        if let Some(headers) = self.headers_mut() {
            headers.extend(res.headers);
        }
        self.write_status(res.status);
        self.write(&res.body);
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }
}
