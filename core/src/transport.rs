//! Blocking HTTP transport built on `ureq`.
//!
//! # Design
//! The agent is configured with `http_status_as_error(false)` so 4xx/5xx
//! responses come back as data; deciding whether a status is a failure is
//! the `Request`'s job, not the transport's. Only the absence of a response
//! (bad URL, connection refused, timeout) is a `TransportError`.
//!
//! Parameters follow the usual HTTP-client keyword names: `url`, `params`
//! (query string), `headers`, `json` and `data` (body).

use std::time::Duration;

use log::debug;
use serde_json::Value;
use ureq::typestate::WithBody;
use ureq::{Agent, RequestBuilder};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Params, Transport};

const KNOWN_PARAMS: [&str; 5] = ["url", "params", "headers", "json", "data"];

/// Settings for `UreqTransport`.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    /// Upper bound for a whole call, connect to last body byte.
    pub timeout: Option<Duration>,
}

/// Executes requests over the network with a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    pub fn with_config(config: TransportConfig) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let params = &request.params;
        let url = request
            .url()
            .ok_or_else(|| TransportError("parameter 'url' must be a string".to_string()))?;
        for key in params.keys().filter(|key| !KNOWN_PARAMS.contains(&key.as_str())) {
            debug!("ignoring unsupported parameter '{key}' for {url}");
        }
        let body = body(params)?;
        if body.is_some() && !carries_body(request.method) {
            return Err(TransportError(format!(
                "{} does not take a request body ('json' or 'data')",
                request.method
            )));
        }

        let result = match request.method {
            HttpMethod::Get => prepare(self.agent.get(url), params)?.call(),
            HttpMethod::Head => prepare(self.agent.head(url), params)?.call(),
            HttpMethod::Delete => prepare(self.agent.delete(url), params)?.call(),
            HttpMethod::Options => prepare(self.agent.options(url), params)?.call(),
            HttpMethod::Post => send_body(prepare(self.agent.post(url), params)?, body),
            HttpMethod::Put => send_body(prepare(self.agent.put(url), params)?, body),
            HttpMethod::Patch => send_body(prepare(self.agent.patch(url), params)?, body),
        };
        let mut response = result.map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError(format!("failed to read response body: {e}")))?;

        Ok(HttpResponse { status, headers, body })
    }
}

/// A request body and its content type.
struct Body {
    content_type: Option<&'static str>,
    bytes: Vec<u8>,
}

fn body(params: &Params) -> Result<Option<Body>, TransportError> {
    match (params.get("json"), params.get("data")) {
        (Some(_), Some(_)) => Err(TransportError(
            "parameters 'json' and 'data' are mutually exclusive".to_string(),
        )),
        (Some(json), None) => {
            let bytes = serde_json::to_vec(json).map_err(|e| TransportError(e.to_string()))?;
            Ok(Some(Body {
                content_type: Some("application/json"),
                bytes,
            }))
        }
        (None, Some(Value::String(data))) => Ok(Some(Body {
            content_type: None,
            bytes: data.clone().into_bytes(),
        })),
        (None, Some(other)) => Err(TransportError(format!(
            "parameter 'data' must be a string, got {other}"
        ))),
        (None, None) => Ok(None),
    }
}

/// Apply `params` and `headers` to any builder.
fn prepare<B>(mut builder: RequestBuilder<B>, params: &Params) -> Result<RequestBuilder<B>, TransportError> {
    for (key, value) in pairs(params, "params")? {
        builder = builder.query(key, text(value));
    }
    for (key, value) in pairs(params, "headers")? {
        builder = builder.header(key.as_str(), text(value));
    }
    Ok(builder)
}

fn carries_body(method: HttpMethod) -> bool {
    matches!(method, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
}

fn send_body(
    mut builder: RequestBuilder<WithBody>,
    body: Option<Body>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => {
            if let Some(content_type) = body.content_type {
                builder = builder.content_type(content_type);
            }
            builder.send(&body.bytes[..])
        }
        None => builder.send_empty(),
    }
}

fn pairs<'a>(params: &'a Params, key: &str) -> Result<Vec<(&'a String, &'a Value)>, TransportError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map.iter().collect()),
        Some(other) => Err(TransportError(format!(
            "parameter '{key}' must be a mapping, got {other}"
        ))),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn json_body_sets_content_type() {
        let body = body(&params(json!({"json": {"a": 1}}))).unwrap().unwrap();
        assert_eq!(body.content_type, Some("application/json"));
        assert_eq!(body.bytes, br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn data_body_is_raw() {
        let body = body(&params(json!({"data": "x=1"}))).unwrap().unwrap();
        assert_eq!(body.content_type, None);
        assert_eq!(body.bytes, b"x=1".to_vec());
    }

    #[test]
    fn json_and_data_conflict() {
        assert!(body(&params(json!({"json": 1, "data": "x"}))).is_err());
    }

    #[test]
    fn non_string_data_is_rejected() {
        assert!(body(&params(json!({"data": 5}))).is_err());
    }

    #[test]
    fn query_and_headers_must_be_mappings() {
        let p = params(json!({"params": ["a"]}));
        assert!(pairs(&p, "params").is_err());
        let p = params(json!({"headers": null}));
        assert!(pairs(&p, "headers").unwrap().is_empty());
    }

    #[test]
    fn scalars_stringify() {
        assert_eq!(text(&json!("a")), "a");
        assert_eq!(text(&json!(2)), "2");
        assert_eq!(text(&json!(true)), "true");
    }

    #[test]
    fn body_on_bodyless_verb_is_transport_error() {
        for method in [HttpMethod::Get, HttpMethod::Head, HttpMethod::Delete, HttpMethod::Options] {
            for extra in [json!({"json": {"a": 1}}), json!({"data": "x"})] {
                let mut p = params(extra);
                p.insert("url".to_string(), json!("http://127.0.0.1:1/"));
                let request = HttpRequest { method, params: p };
                let err = UreqTransport::new().send(&request).unwrap_err();
                assert!(err.0.contains("does not take a request body"), "{method}: {err}");
            }
        }
    }

    #[test]
    fn only_post_put_patch_carry_bodies() {
        let with_body: Vec<HttpMethod> = HttpMethod::ALL.into_iter().filter(|m| carries_body(*m)).collect();
        assert_eq!(with_body, vec![HttpMethod::Post, HttpMethod::Put, HttpMethod::Patch]);
    }

    #[test]
    fn missing_url_is_transport_error() {
        let request = HttpRequest {
            method: HttpMethod::Get,
            params: Params::new(),
        };
        let err = UreqTransport::new().send(&request).unwrap_err();
        assert!(err.0.contains("url"));
    }
}
