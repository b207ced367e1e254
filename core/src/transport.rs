//! Transport seam and the callback-to-future bridge.
//!
//! # Design
//! A transport receives the finished `HttpRequest` and a `Completion`. It
//! reports back exactly once through `Completion::finish`, either inline
//! (synchronous transports, test doubles) or later from another thread.
//! `finish` consumes the completion, so a request cannot settle twice; a
//! completion dropped unfinished settles the request as a transport error.
//!
//! `SyncPromise` is the receiving half. It resolves with the same outcome
//! the user callbacks saw.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult, TransportError};
use crate::http::{HttpRequest, ResponseBody, ResponseMeta};

/// Performs the network round trip for a single request.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest, completion: Completion) -> RequestHandle;
}

impl<F> Transport for F
where
    F: Fn(HttpRequest, Completion) -> RequestHandle + Send + Sync,
{
    fn send(&self, request: HttpRequest, completion: Completion) -> RequestHandle {
        self(request, completion)
    }
}

type Settle = Box<dyn FnOnce(Option<TransportError>, ResponseMeta, Option<String>) + Send>;

/// The transport's callback: `(error, response meta, raw body)`.
pub struct Completion {
    settle: Option<Settle>,
}

impl Completion {
    pub(crate) fn new(
        settle: impl FnOnce(Option<TransportError>, ResponseMeta, Option<String>) + Send + 'static,
    ) -> Self {
        Self {
            settle: Some(Box::new(settle)),
        }
    }

    pub fn finish(mut self, error: Option<TransportError>, meta: ResponseMeta, body: Option<String>) {
        if let Some(settle) = self.settle.take() {
            settle(error, meta, body);
        }
    }

    pub fn succeed(self, meta: ResponseMeta, body: impl Into<String>) {
        self.finish(None, meta, Some(body.into()));
    }

    pub fn fail(self, error: TransportError, meta: ResponseMeta) {
        self.finish(Some(error), meta, None);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(settle) = self.settle.take() {
            settle(
                Some(TransportError::new("request dropped before completion")),
                ResponseMeta::default(),
                None,
            );
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("settled", &self.settle.is_none())
            .finish()
    }
}

/// The in-flight request as returned by the transport.
///
/// Carries whatever low-level control the transport chooses to expose
/// (currently abort), and the final descriptor once the adapter attaches it.
#[derive(Clone)]
pub struct RequestHandle {
    id: Uuid,
    abort: Option<Arc<dyn Fn() + Send + Sync>>,
    settings: Option<HttpRequest>,
}

impl RequestHandle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            abort: None,
            settings: None,
        }
    }

    pub fn with_abort(mut self, abort: impl Fn() + Send + Sync + 'static) -> Self {
        self.abort = Some(Arc::new(abort));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ask the transport to abort. Returns false if it offered no way to.
    pub fn abort(&self) -> bool {
        match &self.abort {
            Some(abort) => {
                abort();
                true
            }
            None => false,
        }
    }

    /// The descriptor the request was dispatched with.
    pub fn ajax_settings(&self) -> Option<&HttpRequest> {
        self.settings.as_ref()
    }

    pub(crate) fn attach_settings(&mut self, settings: HttpRequest) {
        self.settings = Some(settings);
    }
}

impl Default for RequestHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.id)
            .field("abortable", &self.abort.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Deferred result of `SyncAdapter::dispatch`.
#[derive(Debug)]
pub struct SyncPromise {
    request: RequestHandle,
    receiver: oneshot::Receiver<SyncResult<ResponseBody>>,
}

impl SyncPromise {
    pub(crate) fn new(request: RequestHandle, receiver: oneshot::Receiver<SyncResult<ResponseBody>>) -> Self {
        Self { request, receiver }
    }

    pub fn request(&self) -> &RequestHandle {
        &self.request
    }

    /// Block the current thread until the request settles.
    pub fn wait(self) -> SyncResult<ResponseBody> {
        futures::executor::block_on(self)
    }
}

impl Future for SyncPromise {
    type Output = SyncResult<ResponseBody>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(SyncError::Transport {
                message: "request settled without a result".to_string(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
