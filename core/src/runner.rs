//! Sequential batch execution.

use log::info;
use serde_json::Value;

use crate::http::Transport;
use crate::request::Request;
use crate::state::RequestState;
use crate::template::Environment;

/// Every request of a batch, in order, with its outcome.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    requests: Vec<Request>,
}

impl RunReport {
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn count(&self, state: RequestState) -> usize {
        self.requests.iter().filter(|r| r.state() == Some(state)).count()
    }

    /// True when no request ended in `ERROR` or `FAILURE`.
    pub fn passed(&self) -> bool {
        self.count(RequestState::Error) == 0 && self.count(RequestState::Failure) == 0
    }
}

/// Build and send each raw request in order. A bad request never stops the
/// batch.
pub fn run<T>(raw_requests: &[Value], env: &Environment, transport: &mut T) -> RunReport
where
    T: Transport + ?Sized,
{
    let mut requests = Vec::with_capacity(raw_requests.len());
    for (index, raw) in raw_requests.iter().enumerate() {
        let mut request = Request::new(raw, env);
        let state = request.send(transport);
        info!(
            "[{}/{}] {}: {}",
            index + 1,
            raw_requests.len(),
            request.name().unwrap_or("<unnamed>"),
            state.map_or("UNSET", RequestState::as_str)
        );
        requests.push(request);
    }
    RunReport { requests }
}
