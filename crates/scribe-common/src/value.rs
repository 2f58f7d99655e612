//! Read/write helpers over a `serde_json::Value` snapshot.
//!
//! Writes create intermediate objects on the way down (a `fields.title`
//! container may not exist before the first edit). Reads never mutate.

use serde_json::{Map, Value};

use crate::error::OpError;
use crate::path::Path;

/// Read the value at `path`, if present.
pub fn get_at<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut cur = root;
    for seg in path.segments() {
        cur = cur.get(seg.as_str())?;
    }
    Some(cur)
}

/// Mutable access to the value at `path`, if present.
pub fn get_at_mut<'a>(root: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    let mut cur = root;
    for seg in path.segments() {
        cur = cur.get_mut(seg.as_str())?;
    }
    Some(cur)
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Returns the prior value at the path, if any. Fails if a path segment
/// traverses a non-object, non-null value.
pub fn set_at(root: &mut Value, path: &Path, value: Value) -> Result<Option<Value>, OpError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Ok(Some(std::mem::replace(root, value)));
    };

    let mut cur = root;
    for seg in parents {
        if cur.is_null() {
            *cur = Value::Object(Map::new());
        }
        match cur {
            Value::Object(map) => {
                cur = map.entry(seg.as_str()).or_insert(Value::Null);
            }
            _ => return Err(OpError::PathObstructed { path: path.clone() }),
        }
    }

    if cur.is_null() {
        *cur = Value::Object(Map::new());
    }
    match cur {
        Value::Object(map) => Ok(map.insert(last.to_string(), value)),
        _ => Err(OpError::PathObstructed { path: path.clone() }),
    }
}

/// Remove the value at `path`.
///
/// Returns the removed value; removing a missing value is a no-op that
/// returns `None`.
pub fn remove_at(root: &mut Value, path: &Path) -> Result<Option<Value>, OpError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Ok(Some(std::mem::replace(root, Value::Null)));
    };

    let mut cur = root;
    for seg in parents {
        match cur.get_mut(seg.as_str()) {
            Some(next) => cur = next,
            None => return Ok(None),
        }
    }

    match cur {
        Value::Object(map) => Ok(map.remove(last.as_str())),
        Value::Null => Ok(None),
        _ => Err(OpError::PathObstructed { path: path.clone() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_creates_parents() {
        let mut root = json!({});
        let path = Path::field("title", "en-US");

        let prior = set_at(&mut root, &path, json!("Hello")).unwrap();
        assert_eq!(prior, None);
        assert_eq!(root, json!({"fields": {"title": {"en-US": "Hello"}}}));
    }

    #[test]
    fn set_returns_prior() {
        let mut root = json!({"fields": {"title": {"en-US": "Old"}}});
        let path = Path::field("title", "en-US");

        let prior = set_at(&mut root, &path, json!("New")).unwrap();
        assert_eq!(prior, Some(json!("Old")));
        assert_eq!(get_at(&root, &path), Some(&json!("New")));
    }

    #[test]
    fn set_through_scalar_is_obstructed() {
        let mut root = json!({"fields": {"title": "scalar"}});
        let path = Path::field("title", "en-US");

        assert!(matches!(
            set_at(&mut root, &path, json!("x")),
            Err(OpError::PathObstructed { .. })
        ));
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut root = json!({"fields": {}});
        let removed = remove_at(&mut root, &Path::field("title", "en-US")).unwrap();
        assert_eq!(removed, None);
        assert_eq!(root, json!({"fields": {}}));
    }

    #[test]
    fn remove_returns_removed() {
        let mut root = json!({"fields": {"title": {"en-US": "Hello"}}});
        let path = Path::field("title", "en-US");

        let removed = remove_at(&mut root, &path).unwrap();
        assert_eq!(removed, Some(json!("Hello")));
        assert_eq!(get_at(&root, &path), None);
    }
}
