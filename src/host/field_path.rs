//! Dotted/bracketed field paths (`$root.0,1.items[2].label`).
//!
//! Patch paths are written by the differ as `parent.field` for keyed
//! children and `parent[i]` for sequence elements. A host applies them by
//! walking its state one [`Segment`] at a time.

use serde_json::{Map, Value};

use crate::error::HostError;

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Split a field path into segments.
///
/// Every `.`-separated part is a key (possibly empty, as for a keyless
/// root's record) followed by any number of decimal `[i]` indices.
pub fn parse(path: &str) -> Result<Vec<Segment>, HostError> {
    let invalid = |reason: &str| HostError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    if path.is_empty() {
        return Err(invalid("empty path"));
    }

    let mut segments = Vec::new();
    for part in path.split('.') {
        let (key, mut indices) = part.find('[').map_or((part, ""), |i| part.split_at(i));
        if key.contains(']') {
            return Err(invalid("unbalanced ']'"));
        }
        segments.push(Segment::Key(key.to_string()));

        while !indices.is_empty() {
            let after = indices
                .strip_prefix('[')
                .ok_or_else(|| invalid("expected '.' or '[' after index"))?;
            let close = after.find(']').ok_or_else(|| invalid("unterminated index"))?;
            let index = after[..close]
                .parse::<usize>()
                .map_err(|_| invalid("index is not a number"))?;
            segments.push(Segment::Index(index));
            indices = &after[close + 1..];
        }
    }
    Ok(segments)
}

/// Join segments back into path text.
#[must_use]
pub fn format(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 && matches!(segment, Segment::Key(_)) {
            out.push('.');
        }
        out.push_str(&segment.to_string());
    }
    out
}

/// Overwrite the value at `segments` inside `root`.
///
/// Missing intermediates are created (an object before a key, an array
/// before an index); an intermediate of the wrong kind is replaced. Arrays
/// are padded with `null` up to the written index.
pub fn set(root: &mut Value, segments: &[Segment], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    let mut current = root;
    for (i, segment) in parents.iter().enumerate() {
        current = slot(current, segment, &segments[i + 1]);
    }
    match last {
        Segment::Key(key) => {
            ensure_object(current).insert(key.clone(), value);
        }
        Segment::Index(index) => {
            let items = ensure_array(current);
            if items.len() <= *index {
                items.resize(index + 1, Value::Null);
            }
            items[*index] = value;
        }
    }
}

/// Read the value at `segments`, if present.
#[must_use]
pub fn get<'a>(root: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |current, segment| match segment {
        Segment::Key(key) => current.as_object()?.get(key),
        Segment::Index(i) => current.as_array()?.get(*i),
    })
}

fn slot<'a>(current: &'a mut Value, segment: &Segment, next: &Segment) -> &'a mut Value {
    let placeholder = match next {
        Segment::Key(_) => Value::Object(Map::new()),
        Segment::Index(_) => Value::Array(Vec::new()),
    };
    let child = match segment {
        Segment::Key(key) => ensure_object(current).entry(key.clone()).or_insert(Value::Null),
        Segment::Index(index) => {
            let items = ensure_array(current);
            if items.len() <= *index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[*index]
        }
    };
    let fits = match next {
        Segment::Key(_) => child.is_object(),
        Segment::Index(_) => child.is_array(),
    };
    if !fits {
        *child = placeholder;
    }
    child
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(fields) => fields,
        _ => unreachable!("value was just made an object"),
    }
}

fn ensure_array(value: &mut Value) -> &mut Vec<Value> {
    if !value.is_array() {
        *value = Value::Array(Vec::new());
    }
    match value {
        Value::Array(items) => items,
        _ => unreachable!("value was just made an array"),
    }
}
