//! JSON tree helpers shared by the translation store and the instantiator.
//!
//! Plain objects are branches. Arrays and scalars are leaves: they are
//! replaced, never merged element-wise.

use serde_json::{Map, Value};

/// Merge `overlay` onto `base`; `overlay` wins on key collisions
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let next = match merged.get(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value)
                    }
                    _ => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

/// Dotted paths of every leaf (scalar or array) below `tree`
pub fn leaf_paths(tree: &Value) -> Vec<String> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    collect_leaves(tree, &mut prefix, &mut out);
    out
}

fn collect_leaves(node: &Value, prefix: &mut Vec<String>, out: &mut Vec<String>) {
    let Value::Object(map) = node else {
        return;
    };
    for (key, value) in map {
        prefix.push(key.clone());
        if value.is_object() {
            collect_leaves(value, prefix, out);
        } else {
            out.push(prefix.join("."));
        }
        prefix.pop();
    }
}

/// Value at `path`; numeric segments index into arrays
pub fn get_path<'a>(tree: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(tree, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Copy of `tree` with `value` written at `path`
///
/// Missing or non-object intermediates become empty objects, except that
/// an in-bounds numeric segment descends into an existing array.
pub fn set_path(tree: &Value, path: &[String], value: Value) -> Value {
    let mut next = tree.clone();
    set_path_in_place(&mut next, path, value);
    next
}

fn set_path_in_place(node: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return;
    };

    if let Value::Array(items) = node {
        if let Some(item) = head.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            set_path_in_place(item, rest, value);
            return;
        }
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        set_path_in_place(child, rest, value);
    }
}

/// Copy of `tree` without the entry at `path`, plus the removed value
pub fn remove_path(tree: &Value, path: &[String]) -> (Value, Option<Value>) {
    let mut next = tree.clone();
    let removed = remove_path_in_place(&mut next, path);
    (next, removed)
}

fn remove_path_in_place(node: &mut Value, path: &[String]) -> Option<Value> {
    let (last, parents) = path.split_last()?;
    let mut current = node;
    for segment in parents {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    current.as_object_mut()?.remove(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segs(dotted: &str) -> Vec<String> {
        dotted.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_merge_precedence() {
        let common = json!({ "a": { "x": 1, "y": 2 } });
        let template = json!({ "a": { "y": 9 } });
        assert_eq!(deep_merge(&common, &template), json!({ "a": { "x": 1, "y": 9 } }));
    }

    #[test]
    fn test_merge_replaces_arrays_and_scalars() {
        let base = json!({ "list": [1, 2, 3], "obj": { "k": 1 }, "s": "a" });
        let overlay = json!({ "list": [9], "obj": "flat", "s": { "nested": true } });
        assert_eq!(
            deep_merge(&base, &overlay),
            json!({ "list": [9], "obj": "flat", "s": { "nested": true } })
        );
    }

    #[test]
    fn test_leaf_paths_stop_at_arrays() {
        let tree = json!({ "a": { "b": "x", "c": [ { "d": 1 } ] }, "e": 2, "f": {} });
        let mut paths = leaf_paths(&tree);
        paths.sort();
        assert_eq!(paths, vec!["a.b", "a.c", "e"]);
    }

    #[test]
    fn test_set_path_creates_intermediates_without_touching_source() {
        let tree = json!({ "a": "scalar" });
        let next = set_path(&tree, &segs("a.b.c"), json!("v"));
        assert_eq!(next, json!({ "a": { "b": { "c": "v" } } }));
        assert_eq!(tree, json!({ "a": "scalar" }));
    }

    #[test]
    fn test_set_path_into_array() {
        let tree = json!({ "items": [ { "t": "a" }, { "t": "b" } ] });
        let next = set_path(&tree, &segs("items.1.t"), json!("z"));
        assert_eq!(get_path(&next, &segs("items.1.t")), Some(&json!("z")));
    }

    #[test]
    fn test_remove_path() {
        let tree = json!({ "home": { "sections": { "hero": { "t": 1 }, "faq": {} } } });
        let (next, removed) = remove_path(&tree, &segs("home.sections.hero"));
        assert_eq!(removed, Some(json!({ "t": 1 })));
        assert_eq!(next, json!({ "home": { "sections": { "faq": {} } } }));

        let (same, none) = remove_path(&tree, &segs("home.missing.x"));
        assert!(none.is_none());
        assert_eq!(same, tree);
    }
}
