// crates/scenario-harness-core/src/core/identifiers.rs
// ============================================================================
// Module: Scenario Harness Identifiers
// Description: Opaque string identifiers for scenarios, actors, rules, and runs.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings that serialize transparently. Validation
//! (non-empty, uniqueness) happens at the scenario loading boundary, never in
//! these wrappers. Run results refer to scenarios only through
//! [`ScenarioId`], so scenario values stay independently owned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares a transparent string identifier newtype.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_identifier!(
    /// Scenario identifier, unique within a suite.
    ScenarioId
);

string_identifier!(
    /// Actor identifier, unique within a scenario.
    ActorId
);

string_identifier!(
    /// Verification rule identifier, unique within a scenario.
    RuleId
);

string_identifier!(
    /// Identifier of a single scenario execution.
    RunId
);

string_identifier!(
    /// Identifier of an isolated execution environment.
    EnvironmentId
);

string_identifier!(
    /// Fresh agent identity minted per environment.
    AgentId
);

/// Reserved actor identifier used for agent responses in transcripts.
pub const AGENT_ACTOR: &str = "agent";
