// crates/scenario-harness-core/src/runtime/loader.rs
// ============================================================================
// Module: Scenario Loader
// Description: Parse, validate, and hash declarative scenario definitions.
// Purpose: Turn scenario files and globs into validated in-memory scenarios.
// Dependencies: crate::core, glob, serde_json, serde_yaml, toml
// ============================================================================

//! ## Overview
//! Parsing is a pure function of the source text: the same input always
//! yields the same scenarios in the same order. File helpers only read;
//! they never write or create anything. Every scenario is validated and its
//! canonical hash recorded before it leaves this module, and duplicate ids
//! across a suite are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::ConfigurationError;
use crate::core::Scenario;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum scenario source size in bytes.
pub const MAX_SOURCE_BYTES: u64 = 4 * 1024 * 1024;

/// Source file extensions recognized by the loader.
const SUPPORTED_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "toml"];

// ============================================================================
// SECTION: Source Format
// ============================================================================

/// Serialization format of a scenario source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
    /// TOML document.
    Toml,
}

impl SourceFormat {
    /// Detects the format from a path extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnsupportedFormat`] for unknown extensions.
    pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            _ => Err(ConfigurationError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// TOML document holding several scenarios.
#[derive(Deserialize)]
struct TomlScenarioList {
    /// `[[scenarios]]` entries.
    scenarios: Vec<Scenario>,
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses, validates, and hashes scenarios from source text.
///
/// `origin` names the source in error messages.
///
/// # Errors
///
/// Returns [`ConfigurationError`] when parsing or validation fails or when
/// two scenarios in the source share an id.
pub fn parse_scenarios(
    text: &str,
    format: SourceFormat,
    origin: &str,
) -> Result<Vec<Scenario>, ConfigurationError> {
    let parse_error = |message: String| ConfigurationError::Parse {
        path: origin.to_string(),
        message,
    };
    let scenarios = match format {
        SourceFormat::Json => {
            let value: serde_json::Value =
                serde_json::from_str(text).map_err(|err| parse_error(err.to_string()))?;
            if value.is_array() {
                serde_json::from_value::<Vec<Scenario>>(value)
            } else {
                serde_json::from_value::<Scenario>(value).map(|scenario| vec![scenario])
            }
            .map_err(|err| parse_error(err.to_string()))?
        }
        SourceFormat::Yaml => {
            let value: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|err| parse_error(err.to_string()))?;
            if value.is_sequence() {
                serde_yaml::from_value::<Vec<Scenario>>(value)
            } else {
                serde_yaml::from_value::<Scenario>(value).map(|scenario| vec![scenario])
            }
            .map_err(|err| parse_error(err.to_string()))?
        }
        SourceFormat::Toml => {
            let table: toml::Table =
                toml::from_str(text).map_err(|err| parse_error(err.to_string()))?;
            if table.contains_key("scenarios") {
                toml::from_str::<TomlScenarioList>(text).map(|list| list.scenarios)
            } else {
                toml::from_str::<Scenario>(text).map(|scenario| vec![scenario])
            }
            .map_err(|err| parse_error(err.to_string()))?
        }
    };
    let scenarios = scenarios
        .into_iter()
        .map(|scenario| finish_scenario(scenario, origin))
        .collect::<Result<Vec<_>, _>>()?;
    ensure_unique_ids(&scenarios)?;
    Ok(scenarios)
}

/// Validates a parsed scenario and records its canonical hash.
fn finish_scenario(mut scenario: Scenario, origin: &str) -> Result<Scenario, ConfigurationError> {
    scenario.validate()?;
    let digest = scenario.canonical_hash().map_err(|err| ConfigurationError::Parse {
        path: origin.to_string(),
        message: err.to_string(),
    })?;
    scenario.digest = Some(digest);
    Ok(scenario)
}

/// Rejects duplicate scenario identifiers across a suite.
///
/// # Errors
///
/// Returns [`ConfigurationError::DuplicateScenarioId`] on the first duplicate.
pub fn ensure_unique_ids(scenarios: &[Scenario]) -> Result<(), ConfigurationError> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for scenario in scenarios {
        if !seen.insert(scenario.id.as_str()) {
            return Err(ConfigurationError::DuplicateScenarioId(scenario.id.to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: File Loading
// ============================================================================

/// Loads every scenario from one source file.
///
/// # Errors
///
/// Returns [`ConfigurationError`] when the file cannot be read, parsed, or validated.
pub fn load_file(path: &Path) -> Result<Vec<Scenario>, ConfigurationError> {
    let origin = path.display().to_string();
    let format = SourceFormat::from_path(path)?;
    let io_error = |message: String| ConfigurationError::Io {
        path: origin.clone(),
        message,
    };
    let metadata = std::fs::metadata(path).map_err(|err| io_error(err.to_string()))?;
    if metadata.len() > MAX_SOURCE_BYTES {
        return Err(io_error(format!("file exceeds {MAX_SOURCE_BYTES} bytes")));
    }
    let bytes = std::fs::read(path).map_err(|err| io_error(err.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| io_error("file must be utf-8".to_string()))?;
    let mut scenarios = parse_scenarios(&text, format, &origin)?;
    for scenario in &mut scenarios {
        scenario.source = Some(path.to_path_buf());
    }
    Ok(scenarios)
}

/// Expands paths, directories, and glob patterns into source files.
///
/// Matches are sorted per pattern and de-duplicated across patterns while
/// preserving first-seen order.
///
/// # Errors
///
/// Returns [`ConfigurationError`] when a pattern is malformed or matches nothing.
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>, ConfigurationError> {
    let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
    let mut files = Vec::new();
    for pattern in patterns {
        let mut matches = expand_pattern(pattern)?;
        if matches.is_empty() {
            return Err(ConfigurationError::NoMatches(pattern.clone()));
        }
        matches.sort();
        for path in matches {
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

/// Expands one pattern into candidate files.
fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>, ConfigurationError> {
    let direct = Path::new(pattern);
    if direct.is_dir() {
        let nested = direct.join("**").join("*");
        return glob_files(&nested.to_string_lossy(), pattern, true);
    }
    glob_files(pattern, pattern, false)
}

/// Runs a glob and keeps regular files, optionally filtering by extension.
fn glob_files(
    glob_pattern: &str,
    origin: &str,
    supported_only: bool,
) -> Result<Vec<PathBuf>, ConfigurationError> {
    let invalid = |message: String| ConfigurationError::InvalidPathPattern {
        pattern: origin.to_string(),
        message,
    };
    let paths = glob::glob(glob_pattern).map_err(|err| invalid(err.to_string()))?;
    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| invalid(err.to_string()))?;
        if !path.is_file() {
            continue;
        }
        if supported_only && !has_supported_extension(&path) {
            continue;
        }
        files.push(path);
    }
    Ok(files)
}

/// Returns true when the path has a recognized scenario extension.
fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Expands patterns and loads every scenario in input order.
///
/// # Errors
///
/// Returns [`ConfigurationError`] when expansion, parsing, or validation
/// fails, or when two scenarios share an id.
pub fn load_paths(patterns: &[String]) -> Result<Vec<Scenario>, ConfigurationError> {
    let files = expand_patterns(patterns)?;
    let mut scenarios = Vec::new();
    for file in files {
        scenarios.extend(load_file(&file)?);
    }
    ensure_unique_ids(&scenarios)?;
    Ok(scenarios)
}
