//! Model persistence over a pluggable HTTP transport.
//!
//! # Overview
//! Translates CRUD operations on a model into `HttpRequest` descriptors and
//! hands them to an injected `Transport` (host-does-IO pattern). The
//! transport reports back through a `Completion`; the adapter bridges that
//! callback into a `SyncPromise` while also invoking the caller's
//! success/error/always callbacks.
//!
//! # Design
//! - `SyncAdapter` is stateless apart from its transport and `SyncConfig`.
//! - `build_request` is pure, so request shapes can be checked without I/O.
//! - Legacy servers are supported through HTTP emulation (method override)
//!   and JSON emulation (form-encoded bodies, see `form`).
//! - The model contract is a trait; attributes and events stay the model's
//!   business.

pub mod adapter;
pub mod config;
pub mod error;
pub mod form;
pub mod http;
pub mod model;
pub mod options;
pub mod transport;

pub use adapter::SyncAdapter;
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult, TransportError};
pub use http::{Headers, HttpMethod, HttpRequest, RequestBody, ResponseBody, ResponseMeta};
pub use model::{AjaxConfig, AjaxConfigSource, BeforeSend, Model, ModelEvent, Operation};
pub use options::SyncOptions;
pub use transport::{Completion, RequestHandle, SyncPromise, Transport};
