#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use strand::Request;
use tracing::Dispatch;

pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn push(trace: &Trace, entry: impl Into<String>) {
    trace.lock().unwrap().push(entry.into());
}

pub fn entries(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

pub fn get(uri: &str) -> Request {
    http::Request::builder()
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
        .into()
}

/// Log output captured from a dedicated subscriber.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A fmt subscriber writing plain lines (no time, no colour, no target) into
/// the returned buffer.
pub fn capture() -> (Dispatch, Captured) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .finish();
    (Dispatch::new(subscriber), captured)
}

/// Fields of every event seen, as `(name, rendered value)` pairs.
pub type Events = Arc<Mutex<Vec<Vec<(String, String)>>>>;

struct FieldsLayer(Events);

struct FieldsVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldsVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_owned(), format!("{value:?}")));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FieldsLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldsVisitor(Vec::new());
        event.record(&mut visitor);
        self.0.lock().unwrap().push(visitor.0);
    }
}

/// A subscriber recording each event's fields one by one.
pub fn capture_fields() -> (Dispatch, Events) {
    use tracing_subscriber::layer::SubscriberExt;

    let events = Events::default();
    let subscriber = tracing_subscriber::registry().with(FieldsLayer(Arc::clone(&events)));
    (Dispatch::new(subscriber), events)
}
