//! End-to-end sync against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every operation and
//! both emulation modes through a ureq-backed transport. The transport runs
//! requests inline on the calling thread, except in the threaded test where
//! it completes from a worker thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};
use sync_core::{
    AjaxConfig, AjaxConfigSource, Completion, HttpMethod, HttpRequest, Model, ModelEvent,
    Operation, RequestBody, RequestHandle, ResponseBody, ResponseMeta, SyncAdapter, SyncError,
    SyncOptions, Transport, TransportError,
};

/// Execute an `HttpRequest` using ureq.
///
/// Disables ureq's status-code-as-error behavior so 4xx/5xx responses come
/// back as data and the adapter decides what counts as failure.
fn execute(agent: &ureq::Agent, request: &HttpRequest) -> Result<(ResponseMeta, String), ureq::Error> {
    let body = request.body.as_ref().map(RequestBody::encode);
    let mut response = match request.method {
        HttpMethod::Get => with_headers(agent.get(&request.url), request).call(),
        HttpMethod::Delete => with_headers(agent.delete(&request.url), request).call(),
        HttpMethod::Post => send(with_headers(agent.post(&request.url), request), body),
        HttpMethod::Put => send(with_headers(agent.put(&request.url), request), body),
        HttpMethod::Patch => send(with_headers(agent.patch(&request.url), request), body),
    }?;

    let mut meta = ResponseMeta::new(response.status().as_u16());
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            meta.headers.insert(name.as_str(), value);
        }
    }
    let body = response.body_mut().read_to_string()?;
    Ok((meta, body))
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &HttpRequest,
) -> ureq::RequestBuilder<B> {
    for (name, value) in request.headers.iter() {
        builder = builder.header(name, value);
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<String>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent()
}

fn complete(agent: &ureq::Agent, request: &HttpRequest, completion: Completion) {
    match execute(agent, request) {
        Ok((meta, body)) => completion.succeed(meta, body),
        Err(err) => completion.fail(TransportError::new(err.to_string()), ResponseMeta::default()),
    }
}

/// Transport that performs the round trip before `send` returns.
fn inline_transport() -> impl Transport {
    let agent = agent();
    move |request: HttpRequest, completion: Completion| {
        complete(&agent, &request, completion);
        RequestHandle::new()
    }
}

/// Transport that performs the round trip on a worker thread.
fn threaded_transport() -> impl Transport {
    let agent = agent();
    move |request: HttpRequest, completion: Completion| {
        let agent = agent.clone();
        std::thread::spawn(move || complete(&agent, &request, completion));
        RequestHandle::new()
    }
}

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

struct Book {
    base_url: String,
    id: Option<String>,
    attributes: Map<String, Value>,
    ajax: Option<AjaxConfigSource>,
    requests: AtomicUsize,
}

impl Book {
    fn new(base_url: &str, attributes: Value) -> Self {
        let Value::Object(attributes) = attributes else {
            panic!("attributes must be an object");
        };
        Self {
            base_url: base_url.to_string(),
            id: None,
            attributes,
            ajax: None,
            requests: AtomicUsize::new(0),
        }
    }
}

impl Model for Book {
    fn url(&self) -> Option<String> {
        Some(match &self.id {
            Some(id) => format!("{}/library/{id}", self.base_url),
            None => format!("{}/library", self.base_url),
        })
    }

    fn to_json(&self, _options: &SyncOptions) -> Map<String, Value> {
        self.attributes.clone()
    }

    fn trigger(&self, event: ModelEvent<'_>) {
        assert_eq!(event.name(), "request");
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    fn ajax_config(&self) -> Option<AjaxConfigSource> {
        self.ajax.clone()
    }
}

fn json_body(body: ResponseBody) -> Value {
    match body {
        ResponseBody::Json(value) => value,
        other => panic!("expected a JSON body, got {other:?}"),
    }
}

#[test]
fn crud_lifecycle() {
    let base = start_server();
    let adapter = SyncAdapter::new(inline_transport());
    let mut book = Book::new(
        &base,
        json!({"title": "The Tempest", "author": "Bill Shakespeare", "length": 123}),
    );

    // Step 1: create with a JSON body.
    let created = json_body(
        adapter
            .dispatch(Operation::Create, &book, SyncOptions::new())
            .unwrap()
            .wait()
            .unwrap(),
    );
    assert_eq!(created["title"], "The Tempest");
    assert_eq!(created["length"], 123);
    let id = created["id"].as_str().unwrap().to_string();
    book.id = Some(id.clone());

    // Step 2: read it back.
    let fetched = json_body(
        adapter
            .dispatch(Operation::Read, &book, SyncOptions::new())
            .unwrap()
            .wait()
            .unwrap(),
    );
    assert_eq!(fetched, created);

    // Step 3: update through POST + override header + form body.
    book.attributes = match json!({"title": "The Tempest", "author": "Tim Shakespeare"}) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    let options = SyncOptions::new().with_emulate_http(true).with_emulate_json(true);
    let updated = json_body(
        adapter
            .dispatch(Operation::Update, &book, options)
            .unwrap()
            .wait()
            .unwrap(),
    );
    assert_eq!(updated["id"], id.as_str());
    assert_eq!(updated["author"], "Tim Shakespeare");
    assert!(updated.get("length").is_none(), "PUT replaces attributes");

    // Step 4: patch with explicit attrs.
    let attrs = match json!({"length": 99}) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    let patched = json_body(
        adapter
            .dispatch(Operation::Patch, &book, SyncOptions::new().with_attrs(attrs))
            .unwrap()
            .wait()
            .unwrap(),
    );
    assert_eq!(patched["author"], "Tim Shakespeare");
    assert_eq!(patched["length"], 99);

    // Step 5: list the collection filtered by query data.
    let data = match json!({"author": "Tim Shakespeare"}) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    let options = SyncOptions::new()
        .with_url(format!("{base}/library"))
        .with_data(data);
    let listed = json_body(
        adapter
            .dispatch(Operation::Read, &book, options)
            .unwrap()
            .wait()
            .unwrap(),
    );
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Step 6: delete through POST + override header, no body.
    let body = adapter
        .dispatch(
            Operation::Delete,
            &book,
            SyncOptions::new().with_emulate_http(true),
        )
        .unwrap()
        .wait()
        .unwrap();
    assert_eq!(body, ResponseBody::Empty);

    // Step 7: read after delete is a 404, reported to the error callback.
    let errors = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&errors);
    let options = SyncOptions::new()
        .on_success(|_, _, _| panic!("read after delete must fail"))
        .on_error(move |meta, _, _| captured.lock().unwrap().push(meta.status));
    let err = adapter
        .dispatch(Operation::Read, &book, options)
        .unwrap()
        .wait()
        .unwrap_err();
    assert!(matches!(err, SyncError::Status { status: 404, .. }));
    assert_eq!(*errors.lock().unwrap(), vec![404]);

    assert_eq!(book.requests.load(Ordering::SeqCst), 7);
}

#[test]
fn text_responses_are_not_parsed() {
    let base = start_server();
    let adapter = SyncAdapter::new(inline_transport());
    let mut book = Book::new(&base, json!({"title": "Volpone", "author": "Ben Jonson"}));
    let created = json_body(
        adapter
            .dispatch(Operation::Create, &book, SyncOptions::new())
            .unwrap()
            .wait()
            .unwrap(),
    );
    book.id = created["id"].as_str().map(str::to_string);
    book.ajax = Some(AjaxConfig::new().with_header("Accept", "text/plain").into());

    let url = format!("{}/summary", book.url().unwrap());
    let body = adapter
        .dispatch(Operation::Read, &book, SyncOptions::new().with_url(url))
        .unwrap()
        .wait()
        .unwrap();
    assert_eq!(body, ResponseBody::Text("Volpone by Ben Jonson".to_string()));
}

#[test]
fn connection_failure_is_a_transport_error() {
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = closed.local_addr().unwrap();
    drop(closed);

    let adapter = SyncAdapter::new(inline_transport());
    let book = Book::new(&format!("http://{addr}"), json!({}));
    let always = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&always);
    let options = SyncOptions::new().on_always(move |error, _, _| {
        assert!(error.is_some());
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let err = adapter
        .dispatch(Operation::Read, &book, options)
        .unwrap()
        .wait()
        .unwrap_err();
    assert!(matches!(err, SyncError::Transport { .. }));
    assert_eq!(always.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn threaded_transport_settles_the_promise() {
    let base = start_server();
    let adapter = SyncAdapter::new(threaded_transport());
    let book = Book::new(&base, json!({"title": "The Alchemist"}));

    let successes = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&successes);
    let options = SyncOptions::new()
        .with_emulate_json(true)
        .on_success(move |_, status, meta| {
            assert_eq!(status, "success");
            assert_eq!(meta.status, 201);
            seen.fetch_add(1, Ordering::SeqCst);
        });

    let promise = adapter.dispatch(Operation::Create, &book, options).unwrap();
    assert_eq!(book.requests.load(Ordering::SeqCst), 1);
    let created = json_body(promise.await.unwrap());

    assert_eq!(created["title"], "The Alchemist");
    assert_eq!(successes.load(Ordering::SeqCst), 1);
}
