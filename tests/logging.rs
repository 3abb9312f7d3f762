mod common;

use http::StatusCode;
use strand::middleware::{Field, Logger, LoggerOptions, PanicRecovery};
use strand::{handler, wrap};

use common::{capture, capture_fields};

fn ok() -> impl strand::Handler {
    handler::from_fn(|ctx| Box::pin(async move { ctx.string("ok") }))
}

#[tokio::test]
async fn logger_writes_one_record_with_selected_fields() {
    let (dispatch, captured) = capture();
    let opts = LoggerOptions::default()
        .fields([Field::Method, Field::Url, Field::Header])
        .header_keys(["X-My-Header"]);
    let app = wrap(ok())
        .with(Logger::new(opts).with_dispatch(dispatch))
        .build()
        .unwrap();

    let req: strand::Request = http::Request::builder()
        .uri("/a/b/c?x=y")
        .header("x-my-header", "v1")
        .body(bytes::Bytes::new())
        .unwrap()
        .into();
    let res = app.call(req).await;
    assert_eq!(res.body(), b"ok");

    let text = captured.text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1, "{text}");
    let line = lines[0];
    assert!(line.contains("INFO"), "{line}");
    assert!(line.contains("HTTP"), "{line}");
    assert!(line.contains("method=GET"), "{line}");
    assert!(line.contains("URL=/a/b/c?x=y"), "{line}");
    assert!(line.contains("header.X-My-Header=[v1]"), "{line}");
    assert!(!line.contains("host="), "{line}");
}

#[tokio::test]
async fn logger_records_fixed_attributes_as_separate_fields() {
    let (dispatch, events) = capture_fields();
    let opts = LoggerOptions::default().header_keys(["X-Trace"]);
    let app = wrap(ok())
        .with(Logger::new(opts).with_dispatch(dispatch))
        .build()
        .unwrap();

    let req: strand::Request = http::Request::builder()
        .uri("/a?x=y")
        .header("host", "example.com")
        .header("x-trace", "t1")
        .body(bytes::Bytes::new())
        .unwrap()
        .into();
    app.call(req).await;

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    let fields: Vec<(&str, &str)> = events[0]
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .filter(|(k, _)| *k != "message")
        .collect();
    assert_eq!(
        fields,
        [
            ("method", "GET"),
            ("host", "example.com"),
            ("URL", "/a?x=y"),
            ("attrs", "header.X-Trace=[t1]"),
        ]
    );
}

#[tokio::test]
async fn logger_omits_unselected_fields() {
    let (dispatch, events) = capture_fields();
    let opts = LoggerOptions::default().fields([Field::Method]);
    let app = wrap(ok())
        .with(Logger::new(opts).with_dispatch(dispatch))
        .build()
        .unwrap();

    app.call(common::get("/")).await;

    let events = events.lock().unwrap();
    let names: Vec<&str> = events[0]
        .iter()
        .map(|(k, _)| k.as_str())
        .filter(|k| *k != "message")
        .collect();
    assert_eq!(names, ["method"]);
}

#[tokio::test]
async fn recovery_logs_the_panic_value() {
    let (dispatch, captured) = capture();
    let app = wrap(handler::from_fn(|_ctx| Box::pin(async { panic!("boom") })))
        .with(PanicRecovery::new(false).with_dispatch(dispatch))
        .build()
        .unwrap();

    let res = app.call(common::get("/")).await;
    assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let text = captured.text();
    let errors: Vec<&str> = text.lines().filter(|l| l.contains("ERROR")).collect();
    assert_eq!(errors.len(), 1, "{text}");
    assert!(errors[0].contains("recovered from panic"), "{text}");
    assert!(errors[0].contains("value=boom"), "{text}");
    assert!(!errors[0].contains("stack="), "{text}");
}

#[tokio::test]
async fn recovery_can_attach_a_stack() {
    let (dispatch, captured) = capture();
    let app = wrap(handler::from_fn(|_ctx| Box::pin(async { panic!("boom") })))
        .with(PanicRecovery::new(true).with_dispatch(dispatch))
        .build()
        .unwrap();

    app.call(common::get("/")).await;

    let text = captured.text();
    assert!(text.contains("value=boom"), "{text}");
    assert!(text.contains("stack="), "{text}");
}

#[tokio::test]
async fn chain_dispatch_reaches_every_record() {
    let (dispatch, captured) = capture();
    let app = wrap(handler::from_fn(|_ctx| Box::pin(async { panic!("boom") })))
        .with(Logger::default())
        .with(PanicRecovery::new(false))
        .dispatch(dispatch)
        .build()
        .unwrap();

    app.call(common::get("/x")).await;

    let text = captured.text();
    assert!(text.contains("URL=/x"), "{text}");
    assert!(text.contains("value=boom"), "{text}");
}

#[tokio::test]
async fn superfluous_status_write_warns() {
    let (dispatch, captured) = capture();
    let app = wrap(handler::from_fn(|ctx| {
        Box::pin(async move {
            ctx.write_status(StatusCode::CREATED);
            ctx.write_status(StatusCode::ACCEPTED);
        })
    }))
    .dispatch(dispatch)
    .build()
    .unwrap();

    let res = app.call(common::get("/")).await;

    assert_eq!(res.status_code(), StatusCode::CREATED);
    assert!(captured.text().contains("superfluous status write"));
}

#[tokio::test]
async fn log_if_err_passes_the_result_through() {
    let (dispatch, captured) = capture();
    tracing::dispatcher::with_default(&dispatch, || {
        let ok: Result<u8, String> = strand::log::log_if_err(Ok(1));
        assert_eq!(ok, Ok(1));
        let err: Result<u8, String> = strand::log::log_if_err(Err("disk full".to_owned()));
        assert_eq!(err, Err("disk full".to_owned()));
    });

    let text = captured.text();
    assert_eq!(text.lines().count(), 1, "{text}");
    assert!(text.contains("ERROR") && text.contains("err=disk full"), "{text}");
}
