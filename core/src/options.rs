//! Per-call options for `SyncAdapter::dispatch`.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::TransportError;
use crate::http::{Headers, HttpRequest, ResponseBody, ResponseMeta};
use crate::model::BeforeSend;

pub type SuccessCallback = Box<dyn FnOnce(&ResponseBody, &str, &ResponseMeta) + Send>;
pub type ErrorCallback = Box<dyn FnOnce(&ResponseMeta, &str, &str) + Send>;
pub type AlwaysCallback =
    Box<dyn FnOnce(Option<&TransportError>, &ResponseMeta, Option<&str>) + Send>;

/// Options recognized by the adapter.
///
/// Emulation flags left unset fall back to the adapter's `SyncConfig`.
#[derive(Default)]
pub struct SyncOptions {
    pub url: Option<String>,
    pub data: Option<Map<String, Value>>,
    pub attrs: Option<Map<String, Value>>,
    pub emulate_http: Option<bool>,
    pub emulate_json: Option<bool>,
    pub headers: Headers,
    pub before_send: Option<BeforeSend>,
    pub(crate) callbacks: Callbacks,
}

impl SyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_attrs(mut self, attrs: Map<String, Value>) -> Self {
        self.attrs = Some(attrs);
        self
    }

    pub fn with_emulate_http(mut self, emulate: bool) -> Self {
        self.emulate_http = Some(emulate);
        self
    }

    pub fn with_emulate_json(mut self, emulate: bool) -> Self {
        self.emulate_json = Some(emulate);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_before_send(mut self, hook: impl Fn(&mut HttpRequest) + Send + Sync + 'static) -> Self {
        self.before_send = Some(BeforeSend::new(hook));
        self
    }

    pub fn on_success(
        mut self,
        f: impl FnOnce(&ResponseBody, &str, &ResponseMeta) + Send + 'static,
    ) -> Self {
        self.callbacks.success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&ResponseMeta, &str, &str) + Send + 'static) -> Self {
        self.callbacks.error = Some(Box::new(f));
        self
    }

    pub fn on_always(
        mut self,
        f: impl FnOnce(Option<&TransportError>, &ResponseMeta, Option<&str>) + Send + 'static,
    ) -> Self {
        self.callbacks.always = Some(Box::new(f));
        self
    }

    pub fn has_success(&self) -> bool {
        self.callbacks.success.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.callbacks.error.is_some()
    }

    pub fn has_always(&self) -> bool {
        self.callbacks.always.is_some()
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("url", &self.url)
            .field("data", &self.data)
            .field("attrs", &self.attrs)
            .field("emulate_http", &self.emulate_http)
            .field("emulate_json", &self.emulate_json)
            .field("headers", &self.headers)
            .field("before_send", &self.before_send)
            .field("success", &self.has_success())
            .field("error", &self.has_error())
            .field("always", &self.has_always())
            .finish()
    }
}

/// User callbacks, moved out of the options and into the completion when
/// the request is dispatched.
#[derive(Default)]
pub(crate) struct Callbacks {
    pub(crate) success: Option<SuccessCallback>,
    pub(crate) error: Option<ErrorCallback>,
    pub(crate) always: Option<AlwaysCallback>,
}
