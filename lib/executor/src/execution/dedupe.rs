use std::collections::HashMap;

use serde_json::Value;

/// Structural identity of a value: objects are written with sorted keys,
/// arrays keep their order.
pub fn canonical_key(value: &Value) -> Vec<u8> {
    let mut key = Vec::new();
    write_canonical(value, &mut key);
    key
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
            out.push(b'{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_scalar(key.as_str(), out);
                out.push(b':');
                write_canonical(value, out);
            }
            out.push(b'}');
        }
        Value::Array(arr) => {
            out.push(b'[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        scalar => write_scalar(scalar, out),
    }
}

fn write_scalar<T: serde::Serialize + ?Sized>(scalar: &T, out: &mut Vec<u8>) {
    // Writing into a Vec can't fail.
    let _ = serde_json::to_writer(&mut *out, scalar);
}

/// Collects representations, keeping only the first of every structurally equal group.
#[derive(Debug, Default)]
pub struct RepresentationDeduplicator {
    indexes: HashMap<Vec<u8>, usize>,
    representations: Vec<Value>,
}

impl RepresentationDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index the representation is sent under.
    pub fn insert(&mut self, representation: Value) -> usize {
        let key = canonical_key(&representation);
        if let Some(index) = self.indexes.get(&key) {
            return *index;
        }

        let index = self.representations.len();
        self.representations.push(representation);
        self.indexes.insert(key, index);
        index
    }

    pub fn len(&self) -> usize {
        self.representations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.representations.is_empty()
    }

    pub fn into_representations(self) -> Vec<Value> {
        self.representations
    }
}
