//! Submission endpoints for the newsletter and contact flows.
//!
//! Flows never talk to a network: they ask a [`SubmissionBackend`] for a
//! [`Submission`] (latency plus outcome) and resume on the page clock once the
//! latency has elapsed.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::rng::DeterministicRng;
use crate::{Page, Result, TimerId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("network error: {0}")]
pub struct NetworkError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub latency_ms: i64,
    pub outcome: std::result::Result<(), NetworkError>,
}

impl Submission {
    pub fn succeed_after(latency_ms: i64) -> Self {
        Self {
            latency_ms,
            outcome: Ok(()),
        }
    }

    pub fn fail_after(latency_ms: i64, message: &str) -> Self {
        Self {
            latency_ms,
            outcome: Err(NetworkError(message.to_string())),
        }
    }
}

pub trait SubmissionBackend {
    fn submit_email(&self, email: &str) -> Submission;
    fn submit_contact_form(&self, form: &FormData) -> Submission;
}

/// Ordered `(name, value)` pairs, as collected from a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    pub fn append(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_string(), value.to_string()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `application/x-www-form-urlencoded` body.
    pub fn to_urlencoded(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{}={}", form_encode(name), form_encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn form_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'*' | b'-' | b'.' | b'_' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Stand-in endpoints with the reference timings: email sign-up fails one
/// time in ten, contact messages always go through.
#[derive(Debug)]
pub struct SimulatedBackend {
    rng: RefCell<DeterministicRng>,
    email_latency_ms: i64,
    contact_latency_ms: i64,
    email_failure_rate: f64,
}

impl SimulatedBackend {
    pub const EMAIL_LATENCY_MS: i64 = 1_500;
    pub const CONTACT_LATENCY_MS: i64 = 2_000;
    pub const EMAIL_FAILURE_RATE: f64 = 0.1;

    pub fn new(seed: u64) -> Self {
        Self {
            rng: RefCell::new(DeterministicRng::new(seed)),
            email_latency_ms: Self::EMAIL_LATENCY_MS,
            contact_latency_ms: Self::CONTACT_LATENCY_MS,
            email_failure_rate: Self::EMAIL_FAILURE_RATE,
        }
    }

    pub fn shared(seed: u64) -> Rc<dyn SubmissionBackend> {
        Rc::new(Self::new(seed))
    }

    pub fn with_email_failure_rate(mut self, rate: f64) -> Self {
        self.email_failure_rate = rate.clamp(0.0, 1.0);
        self
    }
}

impl SubmissionBackend for SimulatedBackend {
    fn submit_email(&self, email: &str) -> Submission {
        let roll = self.rng.borrow_mut().next_f64();
        if roll < self.email_failure_rate {
            tracing::debug!(email, roll, "simulated email submission failure");
            Submission::fail_after(self.email_latency_ms, "Network error")
        } else {
            Submission::succeed_after(self.email_latency_ms)
        }
    }

    fn submit_contact_form(&self, form: &FormData) -> Submission {
        tracing::debug!(fields = form.entries().len(), "simulated contact submission");
        Submission::succeed_after(self.contact_latency_ms)
    }
}

/// Deterministic endpoints for tests: outcomes are dequeued per call (success
/// once the queue is empty) and every call is recorded.
#[derive(Debug)]
pub struct ScriptedBackend {
    email_outcomes: RefCell<VecDeque<Submission>>,
    contact_outcomes: RefCell<VecDeque<Submission>>,
    email_calls: RefCell<Vec<String>>,
    contact_calls: RefCell<Vec<FormData>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            email_outcomes: RefCell::default(),
            contact_outcomes: RefCell::default(),
            email_calls: RefCell::default(),
            contact_calls: RefCell::default(),
        }
    }

    pub fn push_email_outcome(&self, submission: Submission) {
        self.email_outcomes.borrow_mut().push_back(submission);
    }

    pub fn push_contact_outcome(&self, submission: Submission) {
        self.contact_outcomes.borrow_mut().push_back(submission);
    }

    pub fn email_calls(&self) -> Vec<String> {
        self.email_calls.borrow().clone()
    }

    pub fn contact_calls(&self) -> Vec<FormData> {
        self.contact_calls.borrow().clone()
    }
}

impl SubmissionBackend for ScriptedBackend {
    fn submit_email(&self, email: &str) -> Submission {
        self.email_calls.borrow_mut().push(email.to_string());
        self.email_outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Submission::succeed_after(SimulatedBackend::EMAIL_LATENCY_MS))
    }

    fn submit_contact_form(&self, form: &FormData) -> Submission {
        self.contact_calls.borrow_mut().push(form.clone());
        self.contact_outcomes
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Submission::succeed_after(SimulatedBackend::CONTACT_LATENCY_MS))
    }
}

/// Resumes `resume` with the outcome once the submission latency has passed
/// on the page clock. Events keep dispatching in the meantime.
pub fn await_submission<F>(page: &mut Page, submission: Submission, resume: F) -> TimerId
where
    F: FnOnce(&mut Page, std::result::Result<(), NetworkError>) -> Result<()> + 'static,
{
    let Submission {
        latency_ms,
        outcome,
    } = submission;
    page.schedule_continuation(latency_ms, move |page| resume(page, outcome))
}
