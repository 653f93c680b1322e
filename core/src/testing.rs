//! In-memory doubles for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::limiter::Clock;

/// Clock that only moves when slept on, remembering every sleep.
#[derive(Debug, Clone)]
pub struct FakeClock {
    state: Arc<Mutex<(Instant, Vec<Duration>)>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new((Instant::now(), Vec::new()))),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().unwrap().1.clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().unwrap().0
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock().unwrap();
        state.0 += duration;
        state.1.push(duration);
    }
}

/// Replays canned responses in order and records what was sent.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<(u16, String)>>,
    repeat: Option<(u16, String)>,
    sent: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<(u16, &str)>) -> Self {
        Self {
            responses: RefCell::new(
                responses
                    .into_iter()
                    .map(|(status, body)| (status, body.to_string()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Answers every request with the same response.
    pub fn repeating(status: u16, body: &str) -> Self {
        Self {
            repeat: Some((status, body.to_string())),
            ..Self::default()
        }
    }

    /// Queue JSON values as `200 OK` bodies.
    pub fn json(pages: Vec<serde_json::Value>) -> Self {
        let bodies: Vec<String> = pages.iter().map(|p| p.to_string()).collect();
        Self::new(bodies.iter().map(|b| (200, b.as_str())).collect())
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.sent.borrow().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|r| r.url.clone()).collect()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.sent.borrow_mut().push(request.clone());
        let (status, body) = match self.responses.borrow_mut().pop_front() {
            Some(next) => next,
            None => self
                .repeat
                .clone()
                .ok_or_else(|| ApiError::Transport(format!("no scripted response for {}", request.url)))?,
        };
        Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body,
        })
    }
}
