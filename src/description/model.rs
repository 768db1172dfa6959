//! # Declarative component descriptions.
//!
//! Defines [`ComponentSpec`] — the resolved description of one component —
//! and [`SpecDelta`] — a layered override that merges onto a template.
//!
//! A spec names a component, the module path of its factory, an arbitrary
//! JSON `env`, and an ordered list of child specs. A delta is structurally
//! the same, except `module` distinguishes *absent* (keep the template's)
//! from *null* (delete the component inside a `components` merge).
//!
//! ## Rules
//! - `name` is unique within its parent's `components`; duplicates fail
//!   validation before any component is instantiated.
//! - `_` and `loader` are reserved context names and rejected.
//! - Resolved specs must carry a module path; deltas need not.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::SpecError;

/// Env flag marking a child whose failure must not restart or propagate.
pub const ENV_TEMPORARY: &str = "__temporary__";
/// Env flag marking a context entry the unknown-child sweep leaves alone.
pub const ENV_ADOPTED: &str = "__adopted__";

/// Context names that component specs may not use.
pub const RESERVED_NAMES: [&str; 2] = ["_", "loader"];

/// The resolved description of one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Identifier, unique within the parent's children.
    pub name: String,
    /// Logical module path, possibly with a `#`-separated accessor chain
    /// (`pkg#ns#factory`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arbitrary JSON configuration handed to the factory.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub env: Map<String, Value>,
    /// Ordered child specs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentSpec>,
}

impl ComponentSpec {
    /// Parses a spec out of a JSON value.
    pub fn from_value(v: Value) -> Result<Self, SpecError> {
        let name = v
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();
        serde_json::from_value(v).map_err(|e| SpecError::Malformed {
            name,
            reason: e.to_string(),
        })
    }

    /// Validates this spec and, recursively, its children.
    ///
    /// Checks non-empty names, reserved names, module presence, and child
    /// name uniqueness. Runs before instantiation so malformed descriptions
    /// fail fast.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.name.is_empty() {
            return Err(SpecError::EmptyName);
        }
        if RESERVED_NAMES.contains(&self.name.as_str()) {
            return Err(SpecError::ReservedName {
                name: self.name.clone(),
            });
        }
        if self.module.as_deref().unwrap_or("").is_empty() {
            return Err(SpecError::MissingModule {
                name: self.name.clone(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for child in &self.components {
            if !seen.insert(child.name.as_str()) {
                return Err(SpecError::DuplicateChild {
                    parent: self.name.clone(),
                    name: child.name.clone(),
                });
            }
            child.validate()?;
        }
        Ok(())
    }

    /// Returns an env value by key.
    pub fn env_value(&self, key: &str) -> Option<&Value> {
        self.env.get(key)
    }

    /// Returns an env value as `u64`.
    pub fn env_u64(&self, key: &str) -> Option<u64> {
        self.env.get(key).and_then(Value::as_u64)
    }

    /// Returns an env value as `i64`.
    pub fn env_i64(&self, key: &str) -> Option<i64> {
        self.env.get(key).and_then(Value::as_i64)
    }

    /// Returns an env value as `bool`.
    pub fn env_bool(&self, key: &str) -> Option<bool> {
        self.env.get(key).and_then(Value::as_bool)
    }

    /// Returns an env value as `&str`.
    pub fn env_str(&self, key: &str) -> Option<&str> {
        self.env.get(key).and_then(Value::as_str)
    }

    /// Returns a required non-negative integer env value.
    pub fn require_env_u64(&self, key: &str) -> Result<u64, SpecError> {
        self.env_u64(key).ok_or_else(|| SpecError::Malformed {
            name: self.name.clone(),
            reason: format!("env.{key} must be a non-negative integer"),
        })
    }

    /// Returns a required integer env value.
    pub fn require_env_i64(&self, key: &str) -> Result<i64, SpecError> {
        self.env_i64(key).ok_or_else(|| SpecError::Malformed {
            name: self.name.clone(),
            reason: format!("env.{key} must be an integer"),
        })
    }

    /// True when the child is marked temporary (failures swallowed, no
    /// restart by the parent).
    pub fn is_temporary(&self) -> bool {
        self.env_bool(ENV_TEMPORARY).unwrap_or(false)
    }

    /// True when the component was registered by an outside party and must
    /// survive the unknown-child sweep.
    pub fn is_adopted(&self) -> bool {
        self.env_bool(ENV_ADOPTED).unwrap_or(false)
    }
}

/// A layered override over a [`ComponentSpec`] template.
///
/// `module` is three-valued: absent keeps the template's module, a string
/// replaces it, and JSON `null` deletes the component when the delta entry
/// is merged into a `components` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecDelta {
    /// Name used to match the template entry.
    pub name: String,
    /// Absent = keep, `Some(Some(m))` = replace, `Some(None)` = delete.
    #[serde(
        default,
        deserialize_with = "some_if_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub module: Option<Option<String>>,
    /// Replacement description (non-empty wins over the template).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Shallow env override: every present key replaces the template's
    /// value wholesale.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub env: Map<String, Value>,
    /// Ordered child overrides (see the merge cursor rule).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<SpecDelta>,
}

impl SpecDelta {
    /// Parses a delta out of a JSON value.
    pub fn from_value(v: Value) -> Result<Self, SpecError> {
        let name = v
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();
        serde_json::from_value(v).map_err(|e| SpecError::Malformed {
            name,
            reason: e.to_string(),
        })
    }

    /// True when this entry deletes its match (`"module": null`).
    pub fn is_delete(&self) -> bool {
        matches!(self.module, Some(None))
    }

    /// Converts a delta with no matching template entry into a full spec.
    ///
    /// New entries must be complete: a module path is required here, and
    /// recursively for every nested child.
    pub fn to_spec(&self) -> Result<ComponentSpec, SpecError> {
        let module = match &self.module {
            Some(Some(m)) if !m.is_empty() => m.clone(),
            _ => {
                return Err(SpecError::MissingModule {
                    name: self.name.clone(),
                })
            }
        };
        let mut components = Vec::with_capacity(self.components.len());
        for child in &self.components {
            components.push(child.to_spec()?);
        }
        Ok(ComponentSpec {
            name: self.name.clone(),
            module: Some(module),
            description: self.description.clone(),
            env: self.env.clone(),
            components,
        })
    }
}

/// Distinguishes an explicit JSON `null` from an absent field.
fn some_if_present<'de, D>(d: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(d).map(Some)
}
