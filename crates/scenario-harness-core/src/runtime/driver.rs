// crates/scenario-harness-core/src/runtime/driver.rs
// ============================================================================
// Module: Actor Driver
// Description: Feed scripted turns into an environment and record the transcript.
// Purpose: Execute one scenario run with deterministic causal ordering.
// Dependencies: crate::{core, interfaces, runtime}, tokio
// ============================================================================

//! ## Overview
//! Scripted turns run strictly in order. After sending a turn the driver
//! waits for the turn's condition (a minimum response count or an elapsed
//! time) up to the turn timeout while collecting responses as they arrive.
//! Every transcript entry carries a monotonic sequence number. A timed-out
//! turn is recorded and execution continues unless the scenario sets
//! `abortOnTimeout`. Suite cancellation stops waiting immediately, including
//! while a subscribe or send call is still pending.
//! Responses from any agent identity other than the environment's are
//! discarded and counted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio::time::sleep_until;

use crate::core::AGENT_ACTOR;
use crate::core::ActorId;
use crate::core::ConfigurationError;
use crate::core::EnvironmentSummary;
use crate::core::RunId;
use crate::core::RunRecord;
use crate::core::Scenario;
use crate::core::ScriptedTurn;
use crate::core::SendFailure;
use crate::core::Timestamp;
use crate::core::TranscriptEntry;
use crate::core::TranscriptEntryKind;
use crate::core::TurnTimeout;
use crate::core::WaitCondition;
use crate::interfaces::AgentResponse;
use crate::interfaces::AgentRuntime;
use crate::interfaces::Environment;
use crate::interfaces::OutboundMessage;
use crate::interfaces::RuntimeError;
use crate::runtime::cancel::CancelSignal;
use crate::runtime::collector::MetricsCollector;
use crate::runtime::collector::RunEvent;
use crate::runtime::events::HarnessEvent;
use crate::runtime::events::HarnessEventKind;
use crate::runtime::events::HarnessEventSink;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures that prevent a run from producing a record.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The runtime subscription could not be established.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    /// The scenario could not be prepared for collection.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

// ============================================================================
// SECTION: Driver
// ============================================================================

/// Executes scripted turns against an agent runtime.
pub struct ActorDriver {
    /// Agent runtime collaborator.
    runtime: Arc<dyn AgentRuntime>,
    /// Event sink.
    events: Arc<dyn HarnessEventSink>,
    /// Turn timeout when a turn declares none.
    default_turn_timeout: Duration,
}

impl ActorDriver {
    /// Creates a driver.
    #[must_use]
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        events: Arc<dyn HarnessEventSink>,
        default_turn_timeout: Duration,
    ) -> Self {
        Self {
            runtime,
            events,
            default_turn_timeout,
        }
    }

    /// Runs every scripted turn of a scenario inside an environment.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] when the runtime subscription fails or the
    /// scenario's custom metrics cannot be prepared.
    pub async fn run(
        &self,
        scenario: &Scenario,
        environment: &Environment,
        run_id: RunId,
        cancel: &CancelSignal,
    ) -> Result<RunRecord, DriverError> {
        let collector = MetricsCollector::for_scenario(scenario)?;
        let mut state = RunState::new(scenario, environment, collector, self.events.as_ref());
        let subscribed = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            subscribed = self.runtime.subscribe(environment) => Some(subscribed),
        };
        let Some(subscribed) = subscribed else {
            state.cancelled = true;
            return Ok(state.finish(scenario, environment, run_id));
        };
        let mut receiver = subscribed?;

        for (turn_index, turn) in scenario.turns.iter().enumerate() {
            if cancel.is_cancelled() {
                state.cancelled = true;
                break;
            }
            state.current_turn = turn_index;
            state.turns_attempted += 1;
            let message = state.record_input(turn_index, turn, scenario);
            let sent = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                sent = self.runtime.send(environment, &message) => Some(sent),
            };
            let Some(sent) = sent else {
                state.cancelled = true;
                break;
            };
            if let Err(err) = sent {
                state.send_failures.push(SendFailure {
                    turn_index,
                    message: err.to_string(),
                });
                continue;
            }

            let timeout =
                turn.timeout_ms.map_or(self.default_turn_timeout, Duration::from_millis);
            let condition = turn.wait_condition();
            let wait_started = Instant::now();
            let outcome =
                await_condition(&condition, timeout, &mut receiver, &mut state, cancel).await;
            match outcome {
                WaitOutcome::Satisfied => {
                    state.collector.observe(&RunEvent::TurnCompleted {
                        turn_index,
                    });
                }
                WaitOutcome::TimedOut => {
                    let waited_ms = duration_ms(wait_started.elapsed());
                    state.record_timeout(turn_index, turn, &condition, waited_ms);
                    if scenario.abort_on_timeout {
                        state.aborted = true;
                        break;
                    }
                }
                WaitOutcome::Cancelled => {
                    state.cancelled = true;
                    break;
                }
            }
        }

        while let Ok(response) = receiver.try_recv() {
            state.accept(response);
        }
        Ok(state.finish(scenario, environment, run_id))
    }

    /// Closes the runtime subscription for an environment.
    ///
    /// The caller owns this step so it also runs when [`Self::run`] is
    /// aborted or panics.
    pub async fn detach(&self, environment: &Environment) {
        self.runtime.detach(environment).await;
    }
}

// ============================================================================
// SECTION: Wait Conditions
// ============================================================================

/// Result of waiting for a turn condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitOutcome {
    /// Condition satisfied.
    Satisfied,
    /// Timeout elapsed first.
    TimedOut,
    /// Suite cancellation fired.
    Cancelled,
}

/// Waits for a turn condition while accepting responses.
async fn await_condition(
    condition: &WaitCondition,
    timeout: Duration,
    receiver: &mut mpsc::Receiver<AgentResponse>,
    state: &mut RunState<'_>,
    cancel: &CancelSignal,
) -> WaitOutcome {
    let started = Instant::now();
    let deadline = started + timeout;
    let (required_responses, elapsed_target) = match condition {
        WaitCondition::None => return WaitOutcome::Satisfied,
        WaitCondition::Responses {
            count,
        } => (Some(*count), None),
        WaitCondition::Elapsed {
            ms,
        } => (None, Some(started + Duration::from_millis(*ms))),
    };
    let wake_at = elapsed_target.map_or(deadline, |target| target.min(deadline));
    let mut received: u32 = 0;
    let mut closed = false;

    loop {
        if let Some(required) = required_responses
            && received >= required
        {
            return WaitOutcome::Satisfied;
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => return WaitOutcome::Cancelled,
            maybe = receiver.recv(), if !closed => match maybe {
                Some(response) => {
                    if state.accept(response) {
                        received = received.saturating_add(1);
                    }
                }
                None => closed = true,
            },
            () = sleep_until(wake_at) => {
                return match elapsed_target {
                    Some(target) if target <= deadline => WaitOutcome::Satisfied,
                    _ => WaitOutcome::TimedOut,
                };
            }
        }
    }
}

// ============================================================================
// SECTION: Run State
// ============================================================================

/// Mutable state owned by the driver for one run.
struct RunState<'a> {
    /// Scenario identifier.
    scenario_id: String,
    /// Environment agent identity.
    agent_id: String,
    /// Event sink.
    events: &'a dyn HarnessEventSink,
    /// Metrics collector.
    collector: MetricsCollector,
    /// Transcript in sequence order.
    transcript: Vec<TranscriptEntry>,
    /// Turn index per input sequence number.
    input_turns: BTreeMap<u64, usize>,
    /// Last assigned sequence number.
    sequence: u64,
    /// Turn currently executing.
    current_turn: usize,
    /// Turns attempted.
    turns_attempted: usize,
    /// Recorded timeouts.
    timeouts: Vec<TurnTimeout>,
    /// Recorded send failures.
    send_failures: Vec<SendFailure>,
    /// Remaining turns were skipped after a timeout.
    aborted: bool,
    /// Cancellation interrupted the run.
    cancelled: bool,
    /// Monotonic run start.
    started: Instant,
    /// Wall-clock run start.
    started_at: Timestamp,
}

impl<'a> RunState<'a> {
    /// Creates run state for a scenario and environment.
    fn new(
        scenario: &Scenario,
        environment: &Environment,
        collector: MetricsCollector,
        events: &'a dyn HarnessEventSink,
    ) -> Self {
        Self {
            scenario_id: scenario.id.to_string(),
            agent_id: environment.agent_id.to_string(),
            events,
            collector,
            transcript: Vec::new(),
            input_turns: BTreeMap::new(),
            sequence: 0,
            current_turn: 0,
            turns_attempted: 0,
            timeouts: Vec::new(),
            send_failures: Vec::new(),
            aborted: false,
            cancelled: false,
            started: Instant::now(),
            started_at: Timestamp::now(),
        }
    }

    /// Milliseconds since run start.
    fn offset_ms(&self) -> u64 {
        duration_ms(self.started.elapsed())
    }

    /// Allocates the next sequence number.
    const fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Records a scripted input and builds the outbound message.
    fn record_input(
        &mut self,
        turn_index: usize,
        turn: &ScriptedTurn,
        scenario: &Scenario,
    ) -> OutboundMessage {
        let sequence = self.next_sequence();
        let offset_ms = self.offset_ms();
        self.input_turns.insert(sequence, turn_index);
        self.transcript.push(TranscriptEntry {
            sequence,
            turn_index,
            actor: turn.actor_id.clone(),
            kind: TranscriptEntryKind::Input,
            content: turn.content.clone(),
            at: Timestamp::now(),
            offset_ms,
        });
        self.collector.observe(&RunEvent::InputSent {
            turn_index,
            actor: turn.actor_id.to_string(),
            content: turn.content.clone(),
            offset_ms,
        });
        OutboundMessage {
            sequence,
            turn_index,
            actor_id: turn.actor_id.clone(),
            persona: scenario.actor(&turn.actor_id).and_then(|actor| actor.persona.clone()),
            content: turn.content.clone(),
        }
    }

    /// Accepts a response into the transcript; returns false when discarded.
    fn accept(&mut self, response: AgentResponse) -> bool {
        if response.agent_id.as_str() != self.agent_id {
            self.collector.observe(&RunEvent::ResponseDiscarded);
            self.events.record(&HarnessEvent::now(HarnessEventKind::ResponseDiscarded {
                scenario_id: self.scenario_id.clone(),
                agent_id: response.agent_id.to_string(),
            }));
            return false;
        }
        let turn_index = response
            .in_reply_to
            .and_then(|sequence| self.input_turns.get(&sequence).copied())
            .unwrap_or(self.current_turn);
        let sequence = self.next_sequence();
        let offset_ms = self.offset_ms();
        self.collector.observe(&RunEvent::ResponseReceived {
            turn_index,
            content: response.content.clone(),
            offset_ms,
        });
        self.transcript.push(TranscriptEntry {
            sequence,
            turn_index,
            actor: ActorId::new(AGENT_ACTOR),
            kind: TranscriptEntryKind::Response,
            content: response.content,
            at: Timestamp::now(),
            offset_ms,
        });
        true
    }

    /// Records a turn timeout.
    fn record_timeout(
        &mut self,
        turn_index: usize,
        turn: &ScriptedTurn,
        condition: &WaitCondition,
        waited_ms: u64,
    ) {
        self.collector.observe(&RunEvent::TurnTimedOut {
            turn_index,
        });
        self.timeouts.push(TurnTimeout {
            turn_index,
            actor: turn.actor_id.clone(),
            waited_ms,
            condition: condition.describe(),
        });
        self.events.record(&HarnessEvent::now(HarnessEventKind::TurnTimedOut {
            scenario_id: self.scenario_id.clone(),
            turn_index,
            waited_ms,
        }));
    }

    /// Finalizes metrics and produces the run record.
    fn finish(mut self, scenario: &Scenario, environment: &Environment, run_id: RunId) -> RunRecord {
        let offset_ms = self.offset_ms();
        self.collector.observe(&RunEvent::RunEnded {
            offset_ms,
        });
        RunRecord {
            run_id,
            scenario_id: scenario.id.clone(),
            environment: EnvironmentSummary {
                environment_id: environment.environment_id.clone(),
                agent_id: environment.agent_id.clone(),
                workdir: environment.workdir.clone(),
                plugins: environment.plugins.iter().map(|plugin| plugin.name.clone()).collect(),
            },
            transcript: self.transcript,
            metrics: self.collector.finalize(),
            timeouts: self.timeouts,
            send_failures: self.send_failures,
            turns_attempted: self.turns_attempted,
            aborted: self.aborted,
            cancelled: self.cancelled,
            started_at: self.started_at,
            ended_at: Timestamp::now(),
        }
    }
}

/// Converts a duration to whole milliseconds.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
