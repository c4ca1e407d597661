//! Minimal process environment construction.
//!
//! Instead of forwarding the full ambient environment to a spawned process,
//! the runner copies a short allow-list of variables and layers caller
//! overrides on top. Everything else in the parent environment is invisible
//! to the child.

use std::collections::HashMap;

/// Variables copied from the ambient environment when present.
const INHERITED_VARS: &[&str] = &["PATH", "HOME", "USER", "SHELL", "LANG", "TERM", "TMPDIR"];

/// Builds the environment map for a spawned process: the allow-listed subset
/// of the ambient environment plus `overrides`, which win on conflict.
pub fn minimal_environment(overrides: &HashMap<String, String>) -> HashMap<String, String> {
    let mut env = HashMap::with_capacity(INHERITED_VARS.len() + overrides.len());
    for key in INHERITED_VARS {
        if let Ok(value) = std::env::var(key) {
            env.insert((*key).to_string(), value);
        }
    }
    for (key, value) in overrides {
        env.insert(key.clone(), value.clone());
    }
    env
}
