//! # Environment substitution and top-env linking.
//!
//! Two walks over a merged tree, in order:
//!
//! 1. [`resolve_env`] — every env string starting with `process.env.` is
//!    replaced by the named process environment variable. An optional
//!    `||default` tail supplies a fallback. Values are JSON-parsed with a
//!    raw-string fallback, so `process.env.PORT` can yield a number.
//! 2. [`resolve_links`] — every env string starting with `$._.env.` is
//!    replaced by the named key of the ROOT spec's env. Link targets may be
//!    former `process.env.` values (already resolved by step 1) but must
//!    not be further links.
//!
//! Both walks recurse into nested objects and arrays inside env values and
//! are idempotent. JSON has no `undefined`: a `process.env.` reference with
//! no variable and no default resolves to `null`, while a missing link
//! target is a fail-fast error.

use serde_json::{Map, Value};

use super::model::ComponentSpec;
use crate::errors::SpecError;

/// Reserved prefix marking a process-environment reference.
pub const ENV_VAR_PREFIX: &str = "process.env.";
/// Reserved prefix marking a link into the root spec's env.
pub const TOP_LINK_PREFIX: &str = "$._.env.";

/// Substitutes `process.env.` references throughout the tree.
pub fn resolve_env(spec: &mut ComponentSpec) {
    resolve_env_map(&mut spec.env);
    for child in &mut spec.components {
        resolve_env(child);
    }
}

fn resolve_env_map(map: &mut Map<String, Value>) {
    for (_, v) in map.iter_mut() {
        resolve_env_value(v);
    }
}

fn resolve_env_value(v: &mut Value) {
    match v {
        Value::String(s) if s.starts_with(ENV_VAR_PREFIX) => {
            let rest = s[ENV_VAR_PREFIX.len()..].to_string();
            *v = lookup_process_env(&rest);
        }
        Value::Object(m) => {
            for (_, vv) in m.iter_mut() {
                resolve_env_value(vv);
            }
        }
        Value::Array(a) => {
            for vv in a.iter_mut() {
                resolve_env_value(vv);
            }
        }
        _ => {}
    }
}

fn lookup_process_env(rest: &str) -> Value {
    let (name, default) = match rest.split_once("||") {
        Some((n, d)) => (n, Some(d)),
        None => (rest, None),
    };
    match std::env::var(name) {
        Ok(raw) => parse_loose(&raw),
        Err(_) => default.map(parse_loose).unwrap_or(Value::Null),
    }
}

/// JSON-parses a raw string, falling back to the string itself.
fn parse_loose(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Substitutes `$._.env.` links against the root spec's env.
///
/// Must run after [`resolve_env`] so that link targets are already concrete.
pub fn resolve_links(spec: &mut ComponentSpec) -> Result<(), SpecError> {
    let top = spec.env.clone();
    link_tree(spec, &top)
}

fn link_tree(spec: &mut ComponentSpec, top: &Map<String, Value>) -> Result<(), SpecError> {
    for (_, v) in spec.env.iter_mut() {
        link_value(v, top)?;
    }
    for child in &mut spec.components {
        link_tree(child, top)?;
    }
    Ok(())
}

fn link_value(v: &mut Value, top: &Map<String, Value>) -> Result<(), SpecError> {
    match v {
        Value::String(s) if s.starts_with(TOP_LINK_PREFIX) => {
            let key = s[TOP_LINK_PREFIX.len()..].to_string();
            let target = top
                .get(&key)
                .ok_or_else(|| SpecError::MissingLink { key: key.clone() })?;
            if matches!(target, Value::String(t) if t.starts_with(TOP_LINK_PREFIX)) {
                return Err(SpecError::ChainedLink { key });
            }
            *v = target.clone();
        }
        Value::Object(m) => {
            for (_, vv) in m.iter_mut() {
                link_value(vv, top)?;
            }
        }
        Value::Array(a) => {
            for vv in a.iter_mut() {
                link_value(vv, top)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn spec(v: serde_json::Value) -> ComponentSpec {
        ComponentSpec::from_value(v).unwrap()
    }

    #[test]
    fn env_reference_parses_variable_as_json() {
        std::env::set_var("COMPVISOR_TEST_NUM", "42");
        std::env::set_var("COMPVISOR_TEST_STR", "plain text");

        let mut s = spec(json!({
            "name": "r", "module": "m#f",
            "env": {
                "num": "process.env.COMPVISOR_TEST_NUM",
                "text": "process.env.COMPVISOR_TEST_STR",
                "nested": {"inner": ["process.env.COMPVISOR_TEST_NUM"]}
            }
        }));
        resolve_env(&mut s);

        assert_eq!(s.env["num"], json!(42));
        assert_eq!(s.env["text"], json!("plain text"));
        assert_eq!(s.env["nested"], json!({"inner": [42]}));
    }

    #[test]
    fn missing_variable_takes_default_or_null() {
        std::env::remove_var("COMPVISOR_TEST_ABSENT");

        let mut s = spec(json!({
            "name": "r", "module": "m#f",
            "env": {
                "with_default": "process.env.COMPVISOR_TEST_ABSENT||7",
                "without": "process.env.COMPVISOR_TEST_ABSENT"
            }
        }));
        resolve_env(&mut s);

        assert_eq!(s.env["with_default"], json!(7));
        assert_eq!(s.env["without"], json!(null));
    }

    #[test]
    fn links_resolve_against_root_env() {
        let mut s = spec(json!({
            "name": "r", "module": "m#f",
            "env": {"shared": {"host": "example", "port": 8080}},
            "components": [{
                "name": "a", "module": "m#f",
                "env": {"conn": "$._.env.shared"}
            }]
        }));
        resolve_links(&mut s).unwrap();
        assert_eq!(
            s.components[0].env["conn"],
            json!({"host": "example", "port": 8080})
        );
    }

    #[test]
    fn missing_or_chained_links_fail_fast() {
        let mut s = spec(json!({
            "name": "r", "module": "m#f",
            "components": [{
                "name": "a", "module": "m#f",
                "env": {"x": "$._.env.nope"}
            }]
        }));
        assert!(matches!(
            resolve_links(&mut s),
            Err(SpecError::MissingLink { .. })
        ));

        let mut s = spec(json!({
            "name": "r", "module": "m#f",
            "env": {"a": "$._.env.b", "b": 1},
            "components": [{
                "name": "c", "module": "m#f",
                "env": {"x": "$._.env.a"}
            }]
        }));
        assert!(matches!(
            resolve_links(&mut s),
            Err(SpecError::ChainedLink { .. })
        ));
    }

    #[test]
    fn both_walks_are_idempotent() {
        std::env::set_var("COMPVISOR_TEST_IDEM", "\"v\"");
        let mut s = spec(json!({
            "name": "r", "module": "m#f",
            "env": {"k": "process.env.COMPVISOR_TEST_IDEM", "t": 5},
            "components": [{
                "name": "a", "module": "m#f",
                "env": {"x": "$._.env.t"}
            }]
        }));
        resolve_env(&mut s);
        resolve_links(&mut s).unwrap();
        let once = s.clone();

        resolve_env(&mut s);
        resolve_links(&mut s).unwrap();
        assert_eq!(s, once);
    }

    #[test]
    fn resolved_tree_has_no_reserved_prefixes() {
        std::env::set_var("COMPVISOR_TEST_FULL", "1");
        let mut s = spec(json!({
            "name": "r", "module": "m#f",
            "env": {"a": "process.env.COMPVISOR_TEST_FULL", "b": "x"},
            "components": [{
                "name": "c", "module": "m#f",
                "env": {"d": "$._.env.b", "e": ["process.env.COMPVISOR_TEST_FULL||2"]}
            }]
        }));
        resolve_env(&mut s);
        resolve_links(&mut s).unwrap();

        fn assert_clean(v: &Value) {
            match v {
                Value::String(s) => {
                    assert!(!s.starts_with(ENV_VAR_PREFIX));
                    assert!(!s.starts_with(TOP_LINK_PREFIX));
                }
                Value::Object(m) => m.values().for_each(assert_clean),
                Value::Array(a) => a.iter().for_each(assert_clean),
                _ => {}
            }
        }
        fn walk(s: &ComponentSpec) {
            s.env.values().for_each(assert_clean);
            s.components.iter().for_each(walk);
        }
        walk(&s);
    }
}
