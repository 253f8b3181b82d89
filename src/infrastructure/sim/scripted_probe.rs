//! Scriptable probe for tests and offline demo runs.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::errors::LoadError;
use crate::domain::ports::ImageProbePort;

/// One scripted probe outcome.
#[derive(Debug, Clone)]
pub enum ProbeScript {
    /// The probe resolves successfully.
    Succeed,
    /// The probe fails with the given message.
    Fail(String),
    /// The probe never resolves (exercises the per-attempt timeout).
    Hang,
}

/// Probe whose outcomes are scripted per URL.
///
/// URLs without a script (or with an exhausted script) fall back to
/// the default outcome. Every call is recorded.
#[derive(Debug)]
pub struct ScriptedProbe {
    scripts: Mutex<HashMap<String, VecDeque<ProbeScript>>>,
    default_outcome: ProbeScript,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    /// Probe that succeeds for every URL.
    #[must_use]
    pub fn succeeding() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default_outcome: ProbeScript::Succeed,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Probe that fails every attempt with the given message.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default_outcome: ProbeScript::Fail(message.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Probe with a per-URL outcome sequence, succeeding by default.
    #[must_use]
    pub fn scripted(url: impl Into<String>, outcomes: Vec<ProbeScript>) -> Self {
        let probe = Self::succeeding();
        probe
            .scripts
            .lock()
            .insert(url.into(), outcomes.into_iter().collect());
        probe
    }

    /// All URLs probed so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ImageProbePort for ScriptedProbe {
    async fn probe(&self, url: &str) -> Result<(), LoadError> {
        self.calls.lock().push(url.to_string());
        let outcome = self
            .scripts
            .lock()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.default_outcome.clone());

        match outcome {
            ProbeScript::Succeed => Ok(()),
            ProbeScript::Fail(message) => Err(LoadError::probe(message)),
            ProbeScript::Hang => std::future::pending().await,
        }
    }
}
