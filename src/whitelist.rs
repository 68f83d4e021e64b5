//! Attribute whitelisting.
//!
//! Reduces a node's full attribute tree to the flat set of values approved
//! for export. Paths are slash-separated (`"network/interfaces"`); each
//! matched path contributes one entry keyed by the full path string.

use eyre::{Result, bail};
use serde_json::{Map, Value};

/// Filtered, flat attribute mapping exported with every event.
///
/// Computed once at reporter construction and never mutated afterwards.
pub type AttributeSet = Map<String, Value>;

/// A configured set of exportable attribute paths.
#[derive(Debug, Clone)]
pub struct Whitelist {
    paths: Vec<String>,
}

impl Whitelist {
    pub fn new(paths: &[String]) -> Self {
        Self { paths: paths.to_vec() }
    }

    /// Filter a node attribute tree down to the whitelisted set.
    ///
    /// Paths naming absent keys are skipped with a warning. A path that
    /// traverses through a non-object value is an error.
    pub fn filter(&self, attributes: &Value) -> Result<AttributeSet> {
        let mut filtered = AttributeSet::new();
        for path in &self.paths {
            match lookup(attributes, path)? {
                Some(value) => {
                    filtered.insert(path.clone(), value.clone());
                }
                None => log::warn!("Whitelist attribute {path} not found on node, skipping"),
            }
        }
        Ok(filtered)
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Result<Option<&'a Value>> {
    let mut current = root;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let Value::Object(map) = current else {
            bail!("Whitelist path {path} traverses a non-object value at {segment}");
        };
        match map.get(segment) {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}
