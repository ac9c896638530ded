//! Shared SCM and intervention fixtures for tests and benches.
//!
//! Fixture files live under the workspace `fixtures/` directory and are indexed by
//! `fixtures/manifest.json`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    scms: HashMap<String, String>,
    interventions: HashMap<String, InterventionEntry>,
}

/// An intervention set is always paired with the model it targets.
#[derive(Debug, Deserialize)]
struct InterventionEntry {
    path: String,
    scm: String,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

fn sorted_keys<T>(map: &HashMap<String, T>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

pub mod scms {
    use super::*;

    pub fn keys() -> Vec<String> {
        sorted_keys(&MANIFEST.scms)
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.scms, "scm", name)?;
        read_to_string(rel)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&MANIFEST.scms, "scm", name)?;
        super::load_json(rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.scms, "scm", name)?;
        Ok(resolve_path(rel))
    }
}

pub mod interventions {
    use super::*;

    pub fn keys() -> Vec<String> {
        sorted_keys(&MANIFEST.interventions)
    }

    /// Name of the SCM fixture the intervention set applies to.
    pub fn scm(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.interventions, "intervention", name)?;
        Ok(entry.scm.clone())
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.interventions, "intervention", name)?;
        read_to_string(&entry.path)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let entry = lookup(&MANIFEST.interventions, "intervention", name)?;
        super::load_json(&entry.path)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let entry = lookup(&MANIFEST.interventions, "intervention", name)?;
        Ok(resolve_path(&entry.path))
    }
}
