//! The model-side collaborator contract.
//!
//! # Design
//! The adapter does not own attributes, validation or change tracking. It
//! only needs a model to say where it lives (`url`), how it serializes
//! (`to_json`), and to accept a notification when a request goes out
//! (`trigger`). Per-model transport customization comes from `ajax_config`,
//! which may be a fixed mapping or a transform over the defaults; either
//! form is resolved once per request into a plain `AjaxConfig`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::SyncError;
use crate::http::{Headers, HttpMethod, HttpRequest};
use crate::options::SyncOptions;
use crate::transport::RequestHandle;

/// A CRUD verb at the model level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Patch,
    Delete,
}

impl Operation {
    pub fn method(self) -> HttpMethod {
        match self {
            Operation::Create => HttpMethod::Post,
            Operation::Read => HttpMethod::Get,
            Operation::Update => HttpMethod::Put,
            Operation::Patch => HttpMethod::Patch,
            Operation::Delete => HttpMethod::Delete,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Patch => "patch",
            Operation::Delete => "delete",
        }
    }

    /// Operations that send the model's attributes as the request body.
    pub fn sends_attributes(self) -> bool {
        matches!(self, Operation::Create | Operation::Update | Operation::Patch)
    }
}

impl FromStr for Operation {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Operation::Create),
            "read" => Ok(Operation::Read),
            "update" => Ok(Operation::Update),
            "patch" => Ok(Operation::Patch),
            "delete" => Ok(Operation::Delete),
            other => Err(SyncError::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook run against the outgoing request right before the transport fires.
#[derive(Clone)]
pub struct BeforeSend(Arc<dyn Fn(&mut HttpRequest) + Send + Sync>);

impl BeforeSend {
    pub fn new(hook: impl Fn(&mut HttpRequest) + Send + Sync + 'static) -> Self {
        Self(Arc::new(hook))
    }

    pub fn call(&self, request: &mut HttpRequest) {
        (self.0)(request)
    }

    /// Run `first` and then `second`. Either may be absent.
    pub fn chain(first: Option<BeforeSend>, second: Option<BeforeSend>) -> Option<BeforeSend> {
        match (first, second) {
            (Some(a), Some(b)) => Some(BeforeSend::new(move |request| {
                a.call(request);
                b.call(request);
            })),
            (a, b) => a.or(b),
        }
    }
}

impl fmt::Debug for BeforeSend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BeforeSend(..)")
    }
}

/// Per-model transport customization.
#[derive(Debug, Clone, Default)]
pub struct AjaxConfig {
    pub headers: Headers,
    pub use_xdr: bool,
    pub xhr_fields: Map<String, Value>,
    pub before_send: Option<BeforeSend>,
}

impl AjaxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_use_xdr(mut self, use_xdr: bool) -> Self {
        self.use_xdr = use_xdr;
        self
    }

    pub fn with_xhr_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.xhr_fields.insert(name.into(), value.into());
        self
    }

    pub fn with_before_send(mut self, hook: impl Fn(&mut HttpRequest) + Send + Sync + 'static) -> Self {
        self.before_send = Some(BeforeSend::new(hook));
        self
    }
}

/// Either a fixed `AjaxConfig` or a function deriving one from the defaults.
#[derive(Clone)]
pub enum AjaxConfigSource {
    Mapping(AjaxConfig),
    Transform(Arc<dyn Fn(AjaxConfig) -> AjaxConfig + Send + Sync>),
}

impl AjaxConfigSource {
    pub fn transform(f: impl Fn(AjaxConfig) -> AjaxConfig + Send + Sync + 'static) -> Self {
        AjaxConfigSource::Transform(Arc::new(f))
    }

    pub fn resolve(self) -> AjaxConfig {
        match self {
            AjaxConfigSource::Mapping(config) => config,
            AjaxConfigSource::Transform(f) => f(AjaxConfig::default()),
        }
    }
}

impl fmt::Debug for AjaxConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AjaxConfigSource::Mapping(config) => f.debug_tuple("Mapping").field(config).finish(),
            AjaxConfigSource::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

impl From<AjaxConfig> for AjaxConfigSource {
    fn from(config: AjaxConfig) -> Self {
        AjaxConfigSource::Mapping(config)
    }
}

/// Events the adapter raises on a model.
#[derive(Debug)]
pub enum ModelEvent<'a> {
    /// A request has been handed to the transport.
    Request {
        handle: &'a RequestHandle,
        options: &'a SyncOptions,
        settings: &'a HttpRequest,
    },
}

impl ModelEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            ModelEvent::Request { .. } => "request",
        }
    }
}

/// A persisted model as seen by the adapter.
pub trait Model {
    /// Where the model lives. `None` or an empty string means no URL.
    fn url(&self) -> Option<String>;

    /// Serialized attributes for create/update/patch bodies.
    fn to_json(&self, options: &SyncOptions) -> Map<String, Value>;

    /// Observer notification; the model is the implicit first argument.
    fn trigger(&self, event: ModelEvent<'_>);

    fn ajax_config(&self) -> Option<AjaxConfigSource> {
        None
    }
}
