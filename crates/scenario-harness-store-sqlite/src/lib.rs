// crates/scenario-harness-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Baseline Store
// Description: Durable BaselineStore backend using SQLite WAL.
// Purpose: Keep per-scenario baselines across harness invocations.
// Dependencies: scenario-harness-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`BaselineStore`] implementation that
//! keeps one canonical baseline snapshot per scenario, overwritten on save. Every
//! load re-verifies the stored digest so that a tampered or truncated record
//! surfaces as a store error instead of a silent comparison.
//!
//! [`BaselineStore`]: scenario_harness_core::BaselineStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_BASELINE_BYTES;
pub use store::SqliteBaselineStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
