//! One declarative HTTP request and its state machine.
//!
//! # Design
//! Construction never fails. Every problem with the raw mapping (a template
//! that does not resolve, no verb key, a field of the wrong shape) is
//! recorded in `error` and collapses into `RequestState::Error`, which turns
//! `send` into a no-op. A batch runner can therefore build and send every
//! request unconditionally and only read `state` afterwards.

use log::{debug, warn};
use serde_json::Value;

use crate::error::RequestError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Params, Transport};
use crate::state::RequestState;
use crate::template::Environment;

/// A rendered, ready-to-send request together with its outcome.
///
/// Only obtainable through `Request::new`, so every value is either in
/// `ERROR` or holds a method and parameters to send.
#[derive(Debug, Clone)]
pub struct Request {
    name: Option<String>,
    method: Option<HttpMethod>,
    params: Option<Params>,
    raise_for_status: Option<bool>,
    state: Option<RequestState>,
    response: Option<HttpResponse>,
    error: Option<RequestError>,
}

impl Request {
    /// Build a request from its raw mapping, rendering `name` and the verb's
    /// parameters against `env`.
    pub fn new(raw: &Value, env: &Environment) -> Self {
        let mut request = Request {
            name: None,
            method: None,
            params: None,
            raise_for_status: None,
            state: None,
            response: None,
            error: None,
        };
        if let Err(err) = request.resolve(raw, env) {
            warn!(
                "request '{}' is invalid: {err}",
                request.name.as_deref().unwrap_or("<unnamed>")
            );
            request.state = Some(RequestState::Error);
            request.error = Some(err);
        }
        request
    }

    fn resolve(&mut self, raw: &Value, env: &Environment) -> Result<(), RequestError> {
        let fields = raw.as_object().ok_or(RequestError::NotAMapping)?;

        let name = fields.get("name").ok_or(RequestError::MissingField("name"))?;
        self.name = match env.render(name)? {
            Value::String(name) => Some(name),
            other => {
                return Err(RequestError::InvalidField {
                    field: "name",
                    reason: format!("expected a string, got {other}"),
                })
            }
        };

        let methods: Vec<HttpMethod> = fields.keys().filter_map(|key| HttpMethod::from_key(key)).collect();
        if methods.len() > 1 {
            return Err(RequestError::AmbiguousMethod(methods));
        }
        let method = *methods.first().ok_or(RequestError::MissingMethod)?;
        self.method = Some(method);

        self.params = match env.render(&fields[method.key()])? {
            Value::Object(params) => Some(params),
            other => {
                return Err(RequestError::InvalidField {
                    field: method.key(),
                    reason: format!("expected a mapping of parameters, got {other}"),
                })
            }
        };

        self.raise_for_status = match fields.get("raise_for_status") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(flag)) => Some(*flag),
            Some(other) => {
                return Err(RequestError::InvalidField {
                    field: "raise_for_status",
                    reason: format!("expected a boolean, got {other}"),
                })
            }
        };

        Ok(())
    }

    /// Execute the request through `transport` and classify the outcome.
    ///
    /// Does nothing for a request in `ERROR`. A transport error leaves
    /// `response` unset and yields `FAILURE` whatever `raise_for_status` says.
    pub fn send<T>(&mut self, transport: &mut T) -> Option<RequestState>
    where
        T: Transport + ?Sized,
    {
        if self.state == Some(RequestState::Error) {
            debug!("skipping '{}': request is in ERROR", self.display_name());
            return self.state;
        }
        let request = self.http_request()?;

        match transport.send(&request) {
            Ok(response) => {
                let state = classify(response.ok(), self.raise_for_status);
                debug!(
                    "'{}' {} -> {} {state}",
                    self.display_name(),
                    request.method,
                    response.status
                );
                self.response = Some(response);
                self.state = Some(state);
            }
            Err(err) => {
                warn!("'{}' {}: {err}", self.display_name(), request.method);
                self.error = Some(RequestError::Transport(err));
                self.state = Some(RequestState::Failure);
            }
        }
        self.state
    }

    /// The plain-data call handed to a transport; `None` unless construction
    /// succeeded.
    pub fn http_request(&self) -> Option<HttpRequest> {
        Some(HttpRequest {
            method: self.method?,
            params: self.params.clone()?,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn method(&self) -> Option<HttpMethod> {
        self.method
    }

    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    pub fn raise_for_status(&self) -> Option<bool> {
        self.raise_for_status
    }

    pub fn state(&self) -> Option<RequestState> {
        self.state
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    pub fn error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// Map a response's success flag and the `raise_for_status` policy to a
/// terminal state. Only an explicit `false` downgrades a failing response.
pub fn classify(ok: bool, raise_for_status: Option<bool>) -> RequestState {
    match (ok, raise_for_status) {
        (true, _) => RequestState::Success,
        (false, Some(false)) => RequestState::NotRaised,
        (false, None | Some(true)) => RequestState::Failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TemplateError, TransportError};
    use serde_json::json;

    fn env() -> Environment {
        let mut env = Environment::new();
        env.register("url", "http://localhost:5000");
        env
    }

    fn respond(status: u16) -> impl FnMut(&HttpRequest) -> Result<HttpResponse, TransportError> {
        move |_| Ok(HttpResponse::with_status(status))
    }

    #[test]
    fn classify_decision_table() {
        assert_eq!(classify(true, None), RequestState::Success);
        assert_eq!(classify(true, Some(true)), RequestState::Success);
        assert_eq!(classify(true, Some(false)), RequestState::Success);
        assert_eq!(classify(false, None), RequestState::Failure);
        assert_eq!(classify(false, Some(true)), RequestState::Failure);
        assert_eq!(classify(false, Some(false)), RequestState::NotRaised);
    }

    #[test]
    fn construction_renders_fields() {
        let raw = json!({
            "name": "Get {{ url }}",
            "post": {"url": "{{ url }}/items", "json": {"n": 1}},
            "raise_for_status": false,
        });
        let req = Request::new(&raw, &env());
        assert_eq!(req.state(), None);
        assert_eq!(req.name(), Some("Get http://localhost:5000"));
        assert_eq!(req.method(), Some(HttpMethod::Post));
        assert_eq!(
            req.params().unwrap().get("url"),
            Some(&json!("http://localhost:5000/items"))
        );
        assert_eq!(req.raise_for_status(), Some(false));
        assert!(req.response().is_none());
        assert!(req.error().is_none());
    }

    #[test]
    fn name_failure_stops_before_method() {
        let raw = json!({"name": "{{ missing }}", "get": {"url": "x"}});
        let req = Request::new(&raw, &env());
        assert_eq!(req.state(), Some(RequestState::Error));
        assert_eq!(req.name(), None);
        assert_eq!(req.method(), None);
        assert!(matches!(
            req.error(),
            Some(RequestError::Template(TemplateError::UndefinedVariable(_)))
        ));
    }

    #[test]
    fn param_failure_keeps_name_and_method() {
        let raw = json!({"name": "n", "get": {"url": "{{ missing }}"}});
        let req = Request::new(&raw, &env());
        assert_eq!(req.state(), Some(RequestState::Error));
        assert_eq!(req.name(), Some("n"));
        assert_eq!(req.method(), Some(HttpMethod::Get));
        assert!(req.params().is_none());
    }

    #[test]
    fn multiple_methods_are_an_error() {
        let raw = json!({"name": "n", "get": {"url": "a"}, "delete": {"url": "b"}});
        let req = Request::new(&raw, &env());
        assert_eq!(req.state(), Some(RequestState::Error));
        match req.error() {
            Some(RequestError::AmbiguousMethod(methods)) => assert_eq!(methods.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_fields_are_errors() {
        for raw in [
            json!("not a mapping"),
            json!({"get": {"url": "a"}}),
            json!({"name": 3, "get": {"url": "a"}}),
            json!({"name": "n", "get": "http://a"}),
            json!({"name": "n", "get": {"url": "a"}, "raise_for_status": "no"}),
        ] {
            let req = Request::new(&raw, &env());
            assert_eq!(req.state(), Some(RequestState::Error), "{raw}");
            assert!(req.error().is_some());
        }
    }

    #[test]
    fn constructed_requests_are_either_error_or_sendable() {
        for raw in [
            json!({"name": "n", "get": {"url": "a"}}),
            json!({"name": "n", "options": {}}),
            json!({"name": "{{ missing }}", "get": {"url": "a"}}),
            json!({"name": "n"}),
            json!(null),
        ] {
            let req = Request::new(&raw, &env());
            match req.state() {
                Some(RequestState::Error) => assert!(req.error().is_some(), "{raw}"),
                None => assert!(req.http_request().is_some(), "{raw}"),
                other => panic!("{raw}: unexpected state {other:?}"),
            }
        }
    }

    #[test]
    fn null_raise_for_status_is_unset() {
        let raw = json!({"name": "n", "get": {"url": "a"}, "raise_for_status": null});
        let req = Request::new(&raw, &env());
        assert_eq!(req.state(), None);
        assert_eq!(req.raise_for_status(), None);
    }

    #[test]
    fn send_passes_method_and_params() {
        let raw = json!({"name": "n", "put": {"url": "{{ url }}", "data": "x"}});
        let mut req = Request::new(&raw, &env());
        let mut seen = Vec::new();
        let mut transport = |request: &HttpRequest| -> Result<HttpResponse, TransportError> {
            seen.push(request.clone());
            Ok(HttpResponse::with_status(204))
        };
        assert_eq!(req.send(&mut transport), Some(RequestState::Success));
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, HttpMethod::Put);
        assert_eq!(seen[0].url(), Some("http://localhost:5000"));
        assert_eq!(req.response().map(|r| r.status), Some(204));
    }

    #[test]
    fn send_classifies_error_status() {
        let raw = json!({"name": "n", "get": {"url": "a"}, "raise_for_status": false});
        let mut req = Request::new(&raw, &env());
        req.send(&mut respond(500));
        assert_eq!(req.state(), Some(RequestState::NotRaised));
        assert_eq!(req.response().map(|r| r.status), Some(500));
    }

    #[test]
    fn transport_error_is_failure_even_when_not_raised() {
        let raw = json!({"name": "n", "get": {"url": "a"}, "raise_for_status": false});
        let mut req = Request::new(&raw, &env());
        let mut transport = |_: &HttpRequest| -> Result<HttpResponse, TransportError> {
            Err(TransportError("connection refused".to_string()))
        };
        assert_eq!(req.send(&mut transport), Some(RequestState::Failure));
        assert!(req.response().is_none());
        assert!(matches!(req.error(), Some(RequestError::Transport(_))));
    }

    #[test]
    fn send_on_error_request_is_a_no_op() {
        let raw = json!({"name": "no method"});
        let mut req = Request::new(&raw, &env());
        let mut calls = 0;
        let mut transport = |_: &HttpRequest| -> Result<HttpResponse, TransportError> {
            calls += 1;
            Ok(HttpResponse::with_status(200))
        };
        assert_eq!(req.send(&mut transport), Some(RequestState::Error));
        assert_eq!(calls, 0);
        assert!(req.response().is_none());
        assert!(matches!(req.error(), Some(RequestError::MissingMethod)));
    }
}
