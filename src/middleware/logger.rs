//! Access logging.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use tracing::field::display;
use tracing::{Dispatch, info};

use super::{Middleware, Next};
use crate::context::Context;
use crate::handler::BoxFuture;
use crate::log;
use crate::request::Request;

/// A request attribute the [`Logger`] can record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Field {
    /// `method=GET`
    Method,
    /// `host=example.com`
    Host,
    /// `URL=/a/b/c?x=y`
    Url,
    /// `header.<Key>=[v1 v2]` for each of [`LoggerOptions::header_keys`]
    Header,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Method, Field::Host, Field::Url, Field::Header];

    pub fn key(self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Host   => "host",
            Self::Url    => "URL",
            Self::Header => "header",
        }
    }
}

/// One `key=value` pair of an access record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attr {
    pub key: Cow<'static, str>,
    pub value: String,
}

impl Attr {
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Renders attributes as space-separated `key=value` pairs.
struct Attrs<'a>(&'a [Attr]);

impl fmt::Display for Attrs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attr) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{attr}")?;
        }
        Ok(())
    }
}

type AttrsFn = Arc<dyn Fn(&Request) -> Vec<Attr> + Send + Sync>;

/// Options for [`Logger`].
///
/// The default logs every [`Field`]; with no `header_keys` that means
/// method, host and URL.
#[derive(Clone, Default)]
pub struct LoggerOptions {
    /// Fields to log. `None` means all of [`Field::ALL`].
    pub fields: Option<Vec<Field>>,
    /// Header keys logged when [`Field::Header`] is selected.
    pub header_keys: Vec<String>,
    /// Produces the attributes itself. When set, `fields` and `header_keys`
    /// are ignored. Must not retain the request.
    pub attrs: Option<AttrsFn>,
}

impl LoggerOptions {
    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields = Some(fields.into_iter().collect());
        self
    }

    pub fn header_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.header_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn attrs<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> Vec<Attr> + Send + Sync + 'static,
    {
        self.attrs = Some(Arc::new(f));
        self
    }

    fn selected(&self, field: Field) -> bool {
        self.fields.as_ref().is_none_or(|fields| fields.contains(&field))
    }
}

/// The contents of one access record.
///
/// Fixed fields become fields of their own; header values and custom
/// attributes have dynamic keys and are rendered together.
struct Record<'r> {
    method: Option<&'r str>,
    host: Option<&'r str>,
    url: Option<&'r str>,
    extra: Vec<Attr>,
}

impl fmt::Display for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fixed = [
            (Field::Method, self.method),
            (Field::Host, self.host),
            (Field::Url, self.url),
        ];
        let mut sep = "";
        for (field, value) in fixed {
            if let Some(value) = value {
                write!(f, "{sep}{}={value}", field.key())?;
                sep = " ";
            }
        }
        if !self.extra.is_empty() {
            write!(f, "{sep}{}", Attrs(&self.extra))?;
        }
        Ok(())
    }
}

/// Logs one INFO record `"HTTP"` per request, then continues the chain.
///
/// `method`, `host` and `URL` are recorded as fields of their own. Header
/// values and attributes from [`LoggerOptions::attrs`] go into one `attrs`
/// field of space-separated `key=value` pairs:
///
/// ```text
/// INFO HTTP method=GET host=example.com URL=/a/b/c?x=y attrs=header.X-My-Header=[v1]
/// ```
#[derive(Default)]
pub struct Logger {
    options: LoggerOptions,
    dispatch: Option<Dispatch>,
}

impl Logger {
    pub fn new(options: LoggerOptions) -> Self {
        Self { options, dispatch: None }
    }

    /// Sends access records to `dispatch` instead of the ambient subscriber.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    fn record<'r>(&self, req: &'r Request) -> Record<'r> {
        let opts = &self.options;
        if let Some(f) = &opts.attrs {
            return Record { method: None, host: None, url: None, extra: f(req) };
        }

        let extra = if opts.selected(Field::Header) {
            opts.header_keys
                .iter()
                .map(|key| {
                    let values = req.header_all(key).join(" ");
                    Attr::new(format!("header.{key}"), format!("[{values}]"))
                })
                .collect()
        } else {
            Vec::new()
        };
        Record {
            method: opts.selected(Field::Method).then(|| req.method().as_str()),
            host: opts.selected(Field::Host).then(|| req.host()),
            url: opts.selected(Field::Url).then(|| req.url()),
            extra,
        }
    }
}

impl Middleware for Logger {
    fn serve<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, ()> {
        let rec = self.record(ctx.request());
        log::scoped(self.dispatch.as_ref(), || {
            let extra = (!rec.extra.is_empty()).then(|| Attrs(&rec.extra));
            info!(
                method = rec.method.map(display),
                host = rec.host.map(display),
                URL = rec.url.map(display),
                attrs = extra.map(display),
                "HTTP"
            );
        });
        next.run(ctx)
    }

    fn name(&self) -> &str {
        "Logger"
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn request() -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/a/b/c?x=y")
            .header("host", "example.com")
            .header("x-my-header", "v1")
            .header("x-my-header", "v2")
            .body(Bytes::new())
            .unwrap()
            .into()
    }

    fn rendered(logger: &Logger) -> String {
        logger.record(&request()).to_string()
    }

    #[test]
    fn defaults_log_method_host_and_url() {
        assert_eq!(
            rendered(&Logger::default()),
            "method=POST host=example.com URL=/a/b/c?x=y"
        );
    }

    #[test]
    fn selected_fields_only() {
        let opts = LoggerOptions::default()
            .fields([Field::Url, Field::Header])
            .header_keys(["X-My-Header", "X-Absent"]);
        assert_eq!(
            rendered(&Logger::new(opts)),
            "URL=/a/b/c?x=y header.X-My-Header=[v1 v2] header.X-Absent=[]"
        );
    }

    #[test]
    fn header_keys_need_the_header_field() {
        let opts = LoggerOptions::default()
            .fields([Field::Method])
            .header_keys(["X-My-Header"]);
        assert_eq!(rendered(&Logger::new(opts)), "method=POST");
    }

    #[test]
    fn custom_attrs_take_precedence() {
        let opts = LoggerOptions::default()
            .fields([Field::Method])
            .attrs(|req| vec![Attr::new("path", req.path())]);
        assert_eq!(rendered(&Logger::new(opts)), "path=/a/b/c");
    }
}
