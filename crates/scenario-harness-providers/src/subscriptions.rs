// crates/scenario-harness-providers/src/subscriptions.rs
// ============================================================================
// Module: Response Subscriptions
// Description: Per-environment response channels shared by runtime adapters.
// Purpose: Route agent responses to the driver that owns the environment.
// Dependencies: scenario-harness-core, tokio
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use scenario_harness_core::AgentResponse;
use scenario_harness_core::EnvironmentId;
use scenario_harness_core::RuntimeError;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Buffered responses per environment before delivery fails.
pub(crate) const RESPONSE_BUFFER: usize = 1024;

/// Open response channels keyed by environment.
#[derive(Default)]
pub(crate) struct SubscriptionTable {
    /// Senders for subscribed environments.
    senders: Mutex<BTreeMap<EnvironmentId, mpsc::Sender<AgentResponse>>>,
}

impl SubscriptionTable {
    /// Opens (or replaces) the channel for an environment.
    pub(crate) fn open(
        &self,
        environment_id: &EnvironmentId,
    ) -> Result<mpsc::Receiver<AgentResponse>, RuntimeError> {
        let (sender, receiver) = mpsc::channel(RESPONSE_BUFFER);
        let mut senders = self
            .senders
            .lock()
            .map_err(|_| RuntimeError::Subscribe("subscription table poisoned".to_string()))?;
        senders.insert(environment_id.clone(), sender);
        Ok(receiver)
    }

    /// Delivers a response to the environment's subscriber.
    pub(crate) fn deliver(
        &self,
        environment_id: &EnvironmentId,
        response: AgentResponse,
    ) -> Result<(), RuntimeError> {
        let sender = {
            let senders = self
                .senders
                .lock()
                .map_err(|_| RuntimeError::Send("subscription table poisoned".to_string()))?;
            senders.get(environment_id).cloned()
        };
        let Some(sender) = sender else {
            return Err(RuntimeError::Send(format!(
                "environment {environment_id} has no subscriber"
            )));
        };
        sender.try_send(response).map_err(|err| match err {
            TrySendError::Full(_) => RuntimeError::Send("response buffer full".to_string()),
            TrySendError::Closed(_) => RuntimeError::Send("subscriber closed".to_string()),
        })
    }

    /// Returns true when the environment has an open channel.
    pub(crate) fn contains(&self, environment_id: &EnvironmentId) -> bool {
        self.senders.lock().is_ok_and(|senders| senders.contains_key(environment_id))
    }

    /// Closes the channel for an environment.
    pub(crate) fn close(&self, environment_id: &EnvironmentId) {
        if let Ok(mut senders) = self.senders.lock() {
            senders.remove(environment_id);
        }
    }
}
