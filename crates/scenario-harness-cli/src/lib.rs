// crates/scenario-harness-cli/src/lib.rs
// ============================================================================
// Module: Scenario Harness CLI Library
// Description: Collaborator wiring shared by the CLI binary and its tests.
// Purpose: Turn a validated configuration into a ready suite runner.
// Dependencies: scenario-harness-config, scenario-harness-providers
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) parses arguments and renders
//! output. Everything between a loaded [`HarnessConfig`] and a runnable
//! [`SuiteRunner`] lives in [`wiring`] so it can be exercised directly.
//!
//! [`HarnessConfig`]: scenario_harness_config::HarnessConfig
//! [`SuiteRunner`]: scenario_harness_core::SuiteRunner

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod wiring;
