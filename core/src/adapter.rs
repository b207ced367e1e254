//! Request building and dispatch for model persistence.
//!
//! # Design
//! `SyncAdapter` holds only the injected transport and a `SyncConfig`, and
//! carries no mutable state between calls. `build_request` is the pure half:
//! it turns `(operation, model, options)` into an `HttpRequest`. `dispatch`
//! runs the before-send hooks, hands the request to the transport exactly
//! once, raises the model's `request` event, and returns a `SyncPromise`
//! that settles from the transport's completion.

use futures::channel::oneshot;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult, TransportError};
use crate::form;
use crate::http::{
    Headers, HttpMethod, HttpRequest, RequestBody, ResponseBody, ResponseMeta, CONTENT_TYPE,
    FORM_CONTENT_TYPE, JSON_CONTENT_TYPE, METHOD_OVERRIDE,
};
use crate::model::{AjaxConfigSource, BeforeSend, Model, ModelEvent, Operation};
use crate::options::{Callbacks, SyncOptions};
use crate::transport::{Completion, SyncPromise, Transport};

/// Translates model operations into requests on an injected transport.
#[derive(Debug, Clone)]
pub struct SyncAdapter<T> {
    transport: T,
    config: SyncConfig,
}

/// Body candidate before encoding.
enum Payload {
    /// Serialized model attributes; wrapped under `model` when form-encoded.
    Model(Map<String, Value>),
    /// Explicit `options.data`; form-encoded as given.
    Data(Map<String, Value>),
}

impl<T: Transport> SyncAdapter<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SyncConfig::default())
    }

    pub fn with_config(transport: T, config: SyncConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the request `dispatch` would send, without sending it.
    pub fn build_request<M: Model + ?Sized>(
        &self,
        operation: Operation,
        model: &M,
        options: &SyncOptions,
    ) -> SyncResult<HttpRequest> {
        self.prepare(operation, model, options).map(|(request, _)| request)
    }

    /// Send `operation` for `model` through the transport.
    ///
    /// Returns `Err` only when no URL can be resolved. Every failure after
    /// that is reported to `options`' error callback and through the
    /// returned promise.
    pub fn dispatch<M: Model + ?Sized>(
        &self,
        operation: Operation,
        model: &M,
        mut options: SyncOptions,
    ) -> SyncResult<SyncPromise> {
        let (mut request, before_send) = self.prepare(operation, model, &options)?;
        if let Some(hook) = &before_send {
            hook.call(&mut request);
        }

        let callbacks = std::mem::take(&mut options.callbacks);
        let (sender, receiver) = oneshot::channel();
        let method = request.method;
        let url = request.url.clone();
        let completion = Completion::new(move |error, meta, body| {
            let outcome = settle(callbacks, error, meta, body);
            if let Err(err) = &outcome {
                warn!(%method, %url, error = %err, "sync request failed");
            }
            // The caller may have dropped the promise; callbacks already ran.
            let _ = sender.send(outcome);
        });

        let mut handle = self.transport.send(request.clone(), completion);
        debug!(request_id = %handle.id(), %operation, "dispatched sync request");
        handle.attach_settings(request.clone());

        model.trigger(ModelEvent::Request {
            handle: &handle,
            options: &options,
            settings: &request,
        });

        Ok(SyncPromise::new(handle, receiver))
    }

    fn prepare<M: Model + ?Sized>(
        &self,
        operation: Operation,
        model: &M,
        options: &SyncOptions,
    ) -> SyncResult<(HttpRequest, Option<BeforeSend>)> {
        let method = operation.method();
        let mut url = resolve_url(model, options)?;
        let emulate_http = options.emulate_http.unwrap_or(self.config.emulate_http);
        let emulate_json = options.emulate_json.unwrap_or(self.config.emulate_json);

        let payload = match &options.data {
            Some(data) if method == HttpMethod::Get => {
                let query = form::stringify(data);
                if !query.is_empty() {
                    url = form::append_query(&url, &query);
                }
                None
            }
            Some(data) => Some(Payload::Data(data.clone())),
            None if operation.sends_attributes() => Some(Payload::Model(
                options.attrs.clone().unwrap_or_else(|| model.to_json(options)),
            )),
            None => None,
        };

        let tunnel = emulate_http && method.needs_emulation();
        let mut headers = Headers::new();

        let body = if emulate_json {
            headers.insert(CONTENT_TYPE, FORM_CONTENT_TYPE);
            let mut fields = match payload {
                Some(Payload::Model(attrs)) => {
                    let mut wrapped = Map::new();
                    wrapped.insert("model".to_string(), Value::Object(attrs));
                    wrapped
                }
                Some(Payload::Data(data)) => data,
                None => Map::new(),
            };
            if tunnel {
                fields.insert("_method".to_string(), Value::from(method.as_str()));
            }
            let encoded = form::stringify(&fields);
            (!encoded.is_empty()).then_some(RequestBody::Form(encoded))
        } else {
            payload.map(|payload| {
                headers.insert(CONTENT_TYPE, JSON_CONTENT_TYPE);
                match payload {
                    Payload::Model(map) | Payload::Data(map) => RequestBody::Json(Value::Object(map)),
                }
            })
        };

        if tunnel {
            headers.insert(METHOD_OVERRIDE, method.as_str());
        }

        let ajax = model
            .ajax_config()
            .map(AjaxConfigSource::resolve)
            .unwrap_or_default();
        headers.extend(&ajax.headers);
        headers.extend(&options.headers);

        let request = HttpRequest {
            method: if tunnel { HttpMethod::Post } else { method },
            url,
            headers,
            body,
            use_xdr: ajax.use_xdr,
            xhr_fields: ajax.xhr_fields,
        };
        debug!(
            %operation,
            method = %request.method,
            url = %request.url,
            emulate_http,
            emulate_json,
            "built sync request"
        );

        let before_send = BeforeSend::chain(ajax.before_send, options.before_send.clone());
        Ok((request, before_send))
    }
}

fn resolve_url<M: Model + ?Sized>(model: &M, options: &SyncOptions) -> SyncResult<String> {
    options
        .url
        .clone()
        .filter(|url| !url.is_empty())
        .or_else(|| model.url())
        .filter(|url| !url.is_empty())
        .ok_or(SyncError::UrlMissing)
}

/// Run the user callbacks for one transport outcome and produce the
/// promise value.
fn settle(
    callbacks: Callbacks,
    error: Option<TransportError>,
    meta: ResponseMeta,
    raw: Option<String>,
) -> SyncResult<ResponseBody> {
    let Callbacks {
        success,
        error: on_error,
        always,
    } = callbacks;

    // A transport error is final; its body is never parsed.
    let outcome = match &error {
        Some(err) => Err(SyncError::from(err.clone())),
        None => interpret(&meta, raw.as_deref()),
    };

    match &outcome {
        Ok(body) => {
            if let Some(success) = success {
                success(body, "success", &meta);
            }
        }
        Err(err) => {
            if let Some(on_error) = on_error {
                on_error(&meta, "error", &err.message());
            }
        }
    }

    if let Some(always) = always {
        always(error.as_ref(), &meta, raw.as_deref());
    }

    outcome
}

fn interpret(meta: &ResponseMeta, raw: Option<&str>) -> SyncResult<ResponseBody> {
    if !meta.is_success() {
        return Err(SyncError::Status {
            status: meta.status,
            body: raw.unwrap_or_default().to_string(),
        });
    }
    match raw {
        None | Some("") => Ok(ResponseBody::Empty),
        Some(text) if meta.expects_json() => Ok(ResponseBody::Json(serde_json::from_str(text)?)),
        Some(text) => Ok(ResponseBody::Text(text.to_string())),
    }
}
