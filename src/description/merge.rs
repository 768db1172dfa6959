//! # Template ⊕ delta merge.
//!
//! [`merge`] layers a [`SpecDelta`] over a [`ComponentSpec`] template and
//! returns a fresh spec; neither input is mutated.
//!
//! The `components` merge is ORDER-SENSITIVE. A `last_op` cursor walks the
//! result array: matching an existing entry moves the cursor to it, and a
//! new entry is inserted right after the cursor. A delta can therefore
//! reorder children by "touching" an entry (name only, no changes) to move
//! the cursor, then inserting new entries after it. A naive keyed diff gets
//! this wrong.
//!
//! ## Rules
//! - Renaming the top-level spec requires `override_name` (root merges
//!   only); nested merges always match by name.
//! - Scalars (`module`, `description`) take the delta value if non-empty.
//! - `env` merges shallowly: each present delta key replaces the template
//!   value wholesale, with no recursive merge inside values.
//! - A delta entry with `"module": null` deletes its match; with no match
//!   it is a no-op.

use super::model::{ComponentSpec, SpecDelta};
use crate::errors::SpecError;

/// Merges `delta` over `template` into a fresh [`ComponentSpec`].
pub fn merge(
    template: &ComponentSpec,
    delta: &SpecDelta,
    override_name: bool,
) -> Result<ComponentSpec, SpecError> {
    if template.name != delta.name && !override_name {
        return Err(SpecError::NameMismatch {
            template: template.name.clone(),
            delta: delta.name.clone(),
        });
    }

    let module = match &delta.module {
        Some(Some(m)) if !m.is_empty() => Some(m.clone()),
        _ => template.module.clone(),
    };
    let description = match delta.description.as_deref() {
        Some(d) if !d.is_empty() => Some(d.to_string()),
        _ => template.description.clone(),
    };

    let mut env = template.env.clone();
    for (k, v) in &delta.env {
        env.insert(k.clone(), v.clone());
    }

    Ok(ComponentSpec {
        name: delta.name.clone(),
        module,
        description,
        env,
        components: merge_children(&template.components, &delta.components)?,
    })
}

/// Applies the cursor rule over a `components` array.
fn merge_children(
    template: &[ComponentSpec],
    delta: &[SpecDelta],
) -> Result<Vec<ComponentSpec>, SpecError> {
    let mut result: Vec<ComponentSpec> = template.to_vec();
    let mut last_op: i64 = -1;

    for entry in delta {
        match result.iter().position(|c| c.name == entry.name) {
            Some(idx) => {
                last_op = idx as i64;
                if entry.is_delete() {
                    result.remove(idx);
                    last_op -= 1;
                } else {
                    let updated = merge(&result[idx], entry, false)?;
                    result[idx] = updated;
                }
            }
            None => {
                if entry.is_delete() {
                    continue;
                }
                let pos = (last_op + 1) as usize;
                result.insert(pos, entry.to_spec()?);
                last_op = pos as i64;
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn template() -> ComponentSpec {
        ComponentSpec::from_value(json!({
            "name": "root",
            "module": "std#container",
            "env": {"max_retries": 3, "retry_delay": 10, "msg": "hola"},
            "components": [
                {"name": "a", "module": "m#f", "env": {"n": 1}},
                {"name": "b", "module": "m#f"},
                {"name": "c", "module": "m#f"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn rename_requires_override() {
        let delta = SpecDelta::from_value(json!({"name": "other"})).unwrap();
        assert!(matches!(
            merge(&template(), &delta, false),
            Err(SpecError::NameMismatch { .. })
        ));

        let merged = merge(&template(), &delta, true).unwrap();
        assert_eq!(merged.name, "other");
        assert_eq!(merged.module.as_deref(), Some("std#container"));
    }

    #[test]
    fn env_overrides_are_shallow_and_wholesale() {
        let t = ComponentSpec::from_value(json!({
            "name": "r", "module": "m#f",
            "env": {"nested": {"keep": 1, "drop": 2}, "untouched": true}
        }))
        .unwrap();
        let d = SpecDelta::from_value(json!({
            "name": "r",
            "env": {"nested": {"keep": 9}, "number": null}
        }))
        .unwrap();

        let merged = merge(&t, &d, false).unwrap();
        // The nested object is replaced wholesale, not merged.
        assert_eq!(merged.env["nested"], json!({"keep": 9}));
        assert_eq!(merged.env["untouched"], json!(true));
        // Explicit null overrides survive as null values.
        assert_eq!(merged.env["number"], json!(null));
    }

    #[test]
    fn delete_removes_matched_entry() {
        let delta = SpecDelta::from_value(json!({
            "name": "root",
            "components": [{"name": "b", "module": null}]
        }))
        .unwrap();
        let merged = merge(&template(), &delta, false).unwrap();
        let names: Vec<_> = merged.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn delete_without_match_is_noop() {
        let delta = SpecDelta::from_value(json!({
            "name": "root",
            "components": [{"name": "zz", "module": null}]
        }))
        .unwrap();
        let merged = merge(&template(), &delta, false).unwrap();
        assert_eq!(merged.components.len(), 3);
    }

    #[test]
    fn insert_lands_after_last_touched_entry() {
        // Touch "b" (no changes), then insert "x": x must land right after b.
        let delta = SpecDelta::from_value(json!({
            "name": "root",
            "components": [
                {"name": "b"},
                {"name": "x", "module": "m#f"}
            ]
        }))
        .unwrap();
        let merged = merge(&template(), &delta, false).unwrap();
        let names: Vec<_> = merged.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "x", "c"]);
    }

    #[test]
    fn fresh_insert_lands_at_front() {
        // No entry touched yet: cursor is -1, so the insert lands at 0.
        let delta = SpecDelta::from_value(json!({
            "name": "root",
            "components": [{"name": "x", "module": "m#f"}]
        }))
        .unwrap();
        let merged = merge(&template(), &delta, false).unwrap();
        let names: Vec<_> = merged.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["x", "a", "b", "c"]);
    }

    #[test]
    fn delete_then_insert_takes_the_freed_slot() {
        // Deleting "b" decrements the cursor, so the next insert lands
        // where b used to be.
        let delta = SpecDelta::from_value(json!({
            "name": "root",
            "components": [
                {"name": "b", "module": null},
                {"name": "x", "module": "m#f"}
            ]
        }))
        .unwrap();
        let merged = merge(&template(), &delta, false).unwrap();
        let names: Vec<_> = merged.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "x", "c"]);
    }

    #[test]
    fn nested_merge_updates_matched_entry() {
        let delta = SpecDelta::from_value(json!({
            "name": "root",
            "components": [
                {"name": "a", "env": {"n": 42}}
            ]
        }))
        .unwrap();
        let merged = merge(&template(), &delta, false).unwrap();
        assert_eq!(merged.components[0].env["n"], json!(42));
        assert_eq!(merged.components[0].module.as_deref(), Some("m#f"));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let t = template();
        let d = SpecDelta::from_value(json!({
            "name": "root",
            "env": {"msg": "adios"},
            "components": [{"name": "a", "module": null}]
        }))
        .unwrap();
        let t_before = t.clone();
        let d_before = d.clone();

        let _ = merge(&t, &d, false).unwrap();
        assert_eq!(t, t_before);
        assert_eq!(d, d_before);
    }

    #[test]
    fn new_entries_must_be_complete() {
        let delta = SpecDelta::from_value(json!({
            "name": "root",
            "components": [{"name": "x"}]
        }))
        .unwrap();
        assert!(matches!(
            merge(&template(), &delta, false),
            Err(SpecError::MissingModule { .. })
        ));
    }
}
