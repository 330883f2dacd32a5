// crates/scenario-harness-config/src/lib.rs
// ============================================================================
// Module: Scenario Harness Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for scenario-harness.toml semantics.
// Dependencies: scenario-harness-core, serde, toml
// ============================================================================

//! ## Overview
//! `scenario-harness-config` defines the configuration model for the scenario
//! harness. Loading is strict and fail-closed: oversized files, non-UTF-8
//! input, and out-of-range values are rejected before any suite starts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
