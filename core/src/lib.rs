//! Core of a declarative HTTP request runner.
//!
//! # Overview
//! A raw request mapping (`name`, one verb key such as `get` holding the
//! call's parameters, optional `raise_for_status`) is rendered against a
//! template `Environment`, executed through a caller-supplied `Transport`,
//! and classified into a `RequestState`.
//!
//! # Design
//! - Host-does-IO: `Request` only ever sees the `Transport` trait. Tests use
//!   closures; `UreqTransport` (feature `ureq`) talks to real servers.
//! - Per-request problems never escape as errors. They are stored on the
//!   `Request` and collapse into its state, so `run` can push a whole batch
//!   through without per-request error handling.
//! - Variables and parameters are `serde_json::Value`s.

pub mod error;
pub mod http;
pub mod request;
pub mod runner;
pub mod state;
pub mod template;
#[cfg(feature = "ureq")]
pub mod transport;

pub use error::{InvalidArgument, RequestError, TemplateError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Params, Transport};
pub use request::{classify, Request};
pub use runner::{run, RunReport};
pub use state::RequestState;
pub use template::Environment;
#[cfg(feature = "ureq")]
pub use transport::{TransportConfig, UreqTransport};
