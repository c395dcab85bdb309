use serde_json::{Map, Value};

/// Merges `source` into `target`.
///
/// A `null` source as a whole leaves the target untouched. Below the top level
/// objects merge key by key, arrays merge item by item and keep the tail of the
/// longer side, and anything else (`null` included) replaces the target.
pub fn deep_merge(target: &mut Value, source: Value) {
    if source.is_null() {
        return;
    }
    merge_value(target, source);
}

fn merge_value(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            deep_merge_objects(target_map, source_map);
        }

        (Value::Array(target_arr), Value::Array(source_arr)) => {
            let mut source_iter = source_arr.into_iter();
            for target_val in target_arr.iter_mut() {
                match source_iter.next() {
                    Some(source_val) => merge_value(target_val, source_val),
                    None => break,
                }
            }
            target_arr.extend(source_iter);
        }

        (target_val, source_val) => {
            *target_val = source_val;
        }
    }
}

pub fn deep_merge_objects(target_map: &mut Map<String, Value>, source_map: Map<String, Value>) {
    if target_map.is_empty() {
        *target_map = source_map;
        return;
    }

    for (key, source_val) in source_map {
        match target_map.get_mut(&key) {
            Some(target_val) => merge_value(target_val, source_val),
            None => {
                target_map.insert(key, source_val);
            }
        }
    }
}
