// crates/scenario-harness-core/src/runtime/provisioner.rs
// ============================================================================
// Module: Environment Provisioner
// Description: Construct and tear down isolated per-run execution environments.
// Purpose: Give every scenario run its own directory, agent identity, and plugins.
// Dependencies: crate::{core, interfaces}, tempfile
// ============================================================================

//! ## Overview
//! [`Provisioner::acquire`] creates a fresh temporary working directory, a
//! fresh agent identity, and the plugin set the scenario declares. The
//! returned [`EnvironmentLease`] owns the directory. [`Provisioner::release`]
//! consumes the lease and deletes the directory, reporting any failure.
//! Callers keep the lease outside the task that drives the run so release
//! happens on every exit path, including panics and cancellation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tempfile::TempDir;

use crate::core::AgentId;
use crate::core::EnvironmentId;
use crate::core::EnvironmentSummary;
use crate::core::PluginSpec;
use crate::core::ProvisionError;
use crate::core::RunId;
use crate::core::Scenario;
use crate::core::Timestamp;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::hash_bytes;
use crate::interfaces::Environment;
use crate::interfaces::PluginError;
use crate::interfaces::PluginFactory;
use crate::interfaces::PluginHandle;
use crate::runtime::events::HarnessEvent;
use crate::runtime::events::HarnessEventKind;
use crate::runtime::events::HarnessEventSink;

// ============================================================================
// SECTION: Plugin Factory
// ============================================================================

/// Plugin factory that requires declared build artifacts to exist.
///
/// Each plugin gets its own directory under `<workdir>/plugins/<name>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArtifactPluginFactory;

impl PluginFactory for ArtifactPluginFactory {
    fn construct(
        &self,
        spec: &PluginSpec,
        scenario_dir: &Path,
        workdir: &Path,
    ) -> Result<PluginHandle, PluginError> {
        let artifact = match &spec.artifact {
            Some(path) => {
                let resolved =
                    if path.is_absolute() { path.clone() } else { scenario_dir.join(path) };
                if !resolved.exists() {
                    return Err(PluginError::MissingArtifact(resolved.display().to_string()));
                }
                Some(resolved)
            }
            None => None,
        };
        let plugin_dir = workdir.join("plugins").join(&spec.name);
        std::fs::create_dir_all(&plugin_dir)
            .map_err(|err| PluginError::Construct(err.to_string()))?;
        Ok(PluginHandle {
            name: spec.name.clone(),
            artifact,
        })
    }
}

// ============================================================================
// SECTION: Environment Lease
// ============================================================================

/// Scoped ownership of a provisioned environment.
#[derive(Debug)]
pub struct EnvironmentLease {
    /// Environment view handed to the driver.
    environment: Environment,
    /// Run identifier allocated with the environment.
    run_id: RunId,
    /// Temporary working directory.
    workdir: TempDir,
}

impl EnvironmentLease {
    /// Returns the environment.
    #[must_use]
    pub const fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Returns the run identifier allocated with the environment.
    #[must_use]
    pub const fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Returns a serializable summary of the environment.
    #[must_use]
    pub fn summary(&self) -> EnvironmentSummary {
        EnvironmentSummary {
            environment_id: self.environment.environment_id.clone(),
            agent_id: self.environment.agent_id.clone(),
            workdir: self.environment.workdir.clone(),
            plugins: self.environment.plugins.iter().map(|plugin| plugin.name.clone()).collect(),
        }
    }
}

// ============================================================================
// SECTION: Provisioner
// ============================================================================

/// Constructs and tears down isolated environments.
pub struct Provisioner {
    /// Parent directory for working directories; system temp dir when absent.
    workdir_root: Option<PathBuf>,
    /// Plugin factory.
    plugins: Arc<dyn PluginFactory>,
    /// Event sink.
    events: Arc<dyn HarnessEventSink>,
    /// Monotonic counter mixed into generated identities.
    counter: AtomicU64,
}

impl Provisioner {
    /// Creates a provisioner.
    #[must_use]
    pub fn new(
        workdir_root: Option<PathBuf>,
        plugins: Arc<dyn PluginFactory>,
        events: Arc<dyn HarnessEventSink>,
    ) -> Self {
        Self {
            workdir_root,
            plugins,
            events,
            counter: AtomicU64::new(0),
        }
    }

    /// Provisions an isolated environment for a scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] when the working directory cannot be created
    /// or a required plugin cannot be constructed.
    pub fn acquire(&self, scenario: &Scenario) -> Result<EnvironmentLease, ProvisionError> {
        let workdir = self.create_workdir()?;
        let token = self.identity_token(scenario);
        let environment_id = EnvironmentId::new(format!("env-{token}"));
        let agent_id = AgentId::new(format!("agent-{token}"));
        let run_id = RunId::new(format!("run-{token}"));
        let scenario_dir = scenario
            .source
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let mut plugins = Vec::new();
        for spec in &scenario.plugins {
            match self.plugins.construct(spec, &scenario_dir, workdir.path()) {
                Ok(handle) => plugins.push(handle),
                Err(err) if spec.required => {
                    let hint = err.hint(&spec.name);
                    // Dropping the TempDir removes the partially built directory.
                    drop(workdir);
                    return Err(ProvisionError::PluginUnavailable {
                        plugin: spec.name.clone(),
                        reason: err.to_string(),
                        hint,
                    });
                }
                Err(err) => {
                    self.events.record(&HarnessEvent::now(HarnessEventKind::PluginSkipped {
                        scenario_id: scenario.id.to_string(),
                        plugin: spec.name.clone(),
                        reason: err.to_string(),
                    }));
                }
            }
        }

        let environment = Environment {
            environment_id,
            scenario_id: scenario.id.clone(),
            agent_id,
            workdir: workdir.path().to_path_buf(),
            plugins,
        };
        self.events.record(&HarnessEvent::now(HarnessEventKind::EnvironmentAcquired {
            scenario_id: scenario.id.to_string(),
            environment_id: environment.environment_id.to_string(),
            workdir: environment.workdir.display().to_string(),
        }));
        Ok(EnvironmentLease {
            environment,
            run_id,
            workdir,
        })
    }

    /// Releases an environment and deletes its working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Release`] when the directory cannot be removed.
    pub fn release(&self, lease: EnvironmentLease) -> Result<(), ProvisionError> {
        let EnvironmentLease {
            environment,
            workdir,
            ..
        } = lease;
        let scenario_id = environment.scenario_id.to_string();
        let environment_id = environment.environment_id.to_string();
        match workdir.close() {
            Ok(()) => {
                self.events.record(&HarnessEvent::now(HarnessEventKind::EnvironmentReleased {
                    scenario_id,
                    environment_id,
                }));
                Ok(())
            }
            Err(err) => {
                self.events.record(&HarnessEvent::now(
                    HarnessEventKind::EnvironmentReleaseFailed {
                        scenario_id,
                        environment_id: environment_id.clone(),
                        error: err.to_string(),
                    },
                ));
                Err(ProvisionError::Release {
                    environment: environment_id,
                    message: err.to_string(),
                })
            }
        }
    }

    /// Creates the temporary working directory.
    fn create_workdir(&self) -> Result<TempDir, ProvisionError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("scenario-harness-");
        let result = match &self.workdir_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        result.map_err(|err| ProvisionError::Workdir {
            root: self.workdir_root.as_ref().map_or_else(
                || std::env::temp_dir().display().to_string(),
                |root| root.display().to_string(),
            ),
            message: err.to_string(),
        })
    }

    /// Derives a unique identity token for one acquisition.
    fn identity_token(&self, scenario: &Scenario) -> String {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed);
        let seed = format!(
            "{}:{}:{}:{}",
            scenario.id,
            counter,
            std::process::id(),
            Timestamp::now().as_unix_millis()
        );
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, seed.as_bytes());
        format!("{}-{counter}", digest.short(12))
    }
}
