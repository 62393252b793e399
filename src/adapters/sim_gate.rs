//! Simulated firewall gate.
//!
//! In-memory stand-in for the network controller's firewall API.  It keeps
//! a small rule table and authenticates every call with the configured
//! [`GateAuth`] strategy:
//!
//! - `Credentials` log in once and reuse the session until it expires,
//!   then log in again transparently.
//! - `ApiKey` sends the key with every request.
//!
//! Failures and latency can be injected to exercise the monitor's retry
//! paths.  Latency at or above the call timeout returns
//! [`GateError::Timeout`] after waiting out the timeout, never longer.

use core::time::Duration;
use std::collections::VecDeque;

use log::{debug, info};

use crate::app::ports::{GatePort, RuleId};
use crate::config::GateAuth;
use crate::error::GateError;

#[derive(Debug, Clone)]
struct SimRule {
    id: RuleId,
    name: String,
    enabled: bool,
}

/// In-memory firewall controller.
pub struct SimulatedGate {
    auth: GateAuth,
    /// Credentials the controller accepts; `None` accepts any.
    accepted: Option<GateAuth>,
    session: Option<u32>,
    sessions_opened: u32,
    rules: Vec<SimRule>,
    timeout: Duration,
    latency: Duration,
    pending_failures: VecDeque<GateError>,
    calls: u32,
}

impl SimulatedGate {
    pub fn new(auth: GateAuth, timeout: Duration) -> Self {
        Self {
            auth,
            accepted: None,
            session: None,
            sessions_opened: 0,
            rules: Vec::new(),
            timeout,
            latency: Duration::ZERO,
            pending_failures: VecDeque::new(),
            calls: 0,
        }
    }

    /// Add a rule to the table.
    #[must_use]
    pub fn with_rule(mut self, id: &str, name: &str, enabled: bool) -> Self {
        self.rules.push(SimRule {
            id: RuleId::new(id),
            name: name.to_string(),
            enabled,
        });
        self
    }

    /// Only accept this credential.
    #[must_use]
    pub fn accepting(mut self, auth: GateAuth) -> Self {
        self.accepted = Some(auth);
        self
    }

    pub fn set_latency(&mut self, latency: Duration) {
        self.latency = latency;
    }

    /// Fail the next call with `error`.  Queued failures fire in order.
    pub fn inject_failure(&mut self, error: GateError) {
        self.pending_failures.push_back(error);
    }

    /// Drop the login session; the next call logs in again.
    pub fn expire_session(&mut self) {
        self.session = None;
    }

    /// Current state of a rule, bypassing auth and failure injection.
    pub fn rule_enabled(&self, id: &str) -> Option<bool> {
        self.rules.iter().find(|r| r.id.as_str() == id).map(|r| r.enabled)
    }

    pub fn calls(&self) -> u32 {
        self.calls
    }

    pub fn sessions_opened(&self) -> u32 {
        self.sessions_opened
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Common request preamble: latency, injected failure, auth.
    fn request(&mut self) -> Result<(), GateError> {
        self.calls = self.calls.wrapping_add(1);

        if !self.latency.is_zero() {
            if self.latency >= self.timeout {
                std::thread::sleep(self.timeout);
                return Err(GateError::Timeout);
            }
            std::thread::sleep(self.latency);
        }

        if let Some(e) = self.pending_failures.pop_front() {
            return Err(e);
        }

        self.authenticate()
    }

    fn authenticate(&mut self) -> Result<(), GateError> {
        let valid = self.accepted.as_ref().is_none_or(|a| *a == self.auth);
        match self.auth {
            GateAuth::ApiKey { .. } => {
                if valid {
                    Ok(())
                } else {
                    Err(GateError::Unauthorized)
                }
            }
            GateAuth::Credentials { .. } => {
                if self.session.is_some() {
                    return Ok(());
                }
                if !valid {
                    return Err(GateError::Unauthorized);
                }
                self.sessions_opened += 1;
                self.session = Some(self.sessions_opened);
                info!("SIM gate: login ok (session {})", self.sessions_opened);
                Ok(())
            }
        }
    }

    fn rule_mut(&mut self, id: &RuleId) -> Result<&mut SimRule, GateError> {
        self.rules
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or(GateError::RuleNotFound)
    }
}

impl GatePort for SimulatedGate {
    fn find_rule(&mut self, name: &str) -> Result<Option<RuleId>, GateError> {
        self.request()?;
        Ok(self
            .rules
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.id.clone()))
    }

    fn rule_status(&mut self, rule: &RuleId) -> Result<bool, GateError> {
        self.request()?;
        Ok(self.rule_mut(rule)?.enabled)
    }

    fn set_rule_enabled(&mut self, rule: &RuleId, enabled: bool) -> Result<(), GateError> {
        self.request()?;
        let r = self.rule_mut(rule)?;
        r.enabled = enabled;
        debug!("SIM gate: rule {} ({}) enabled={}", r.id, r.name, enabled);
        Ok(())
    }
}
