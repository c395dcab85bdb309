use serde_json::Value;

use crate::{
    plan::plan_nodes::{FetchNodePathSegment, FetchRewrite, KeyRenamer, ValueSetter},
    schema::metadata::PossibleTypes,
    utils::consts::TYPENAME_FIELD_NAME,
};

pub trait FetchRewriteExt {
    fn rewrite(&self, possible_types: &PossibleTypes, value: &mut Value);
}

impl FetchRewriteExt for FetchRewrite {
    fn rewrite(&self, possible_types: &PossibleTypes, value: &mut Value) {
        match self {
            FetchRewrite::KeyRenamer(key_renamer) => key_renamer.apply(possible_types, value),
            FetchRewrite::ValueSetter(value_setter) => value_setter.apply(possible_types, value),
        }
    }
}

/// Applies `rewrites` in order, each one seeing the result of the previous.
pub fn apply_rewrites(rewrites: &[FetchRewrite], possible_types: &PossibleTypes, value: &mut Value) {
    for rewrite in rewrites {
        rewrite.rewrite(possible_types, value);
    }
}

trait RewriteApplier {
    fn apply(&self, possible_types: &PossibleTypes, value: &mut Value);
    fn apply_path(
        &self,
        possible_types: &PossibleTypes,
        value: &mut Value,
        path: &[FetchNodePathSegment],
    );
}

fn satisfies_guard(
    possible_types: &PossibleTypes,
    value: &serde_json::Map<String, Value>,
    type_condition: &str,
) -> bool {
    let type_name = value
        .get(TYPENAME_FIELD_NAME)
        .and_then(Value::as_str)
        .unwrap_or(type_condition);
    possible_types.entity_satisfies_type_condition(type_name, type_condition)
}

impl RewriteApplier for KeyRenamer {
    fn apply(&self, possible_types: &PossibleTypes, value: &mut Value) {
        self.apply_path(possible_types, value, &self.path)
    }

    fn apply_path(
        &self,
        possible_types: &PossibleTypes,
        value: &mut Value,
        path: &[FetchNodePathSegment],
    ) {
        let Some((current_segment, remaining_path)) = path.split_first() else {
            return;
        };

        match value {
            Value::Array(arr) => {
                for item in arr {
                    self.apply_path(possible_types, item, path);
                }
            }
            Value::Object(obj) => match current_segment {
                FetchNodePathSegment::TypenameEquals(type_condition) => {
                    if satisfies_guard(possible_types, obj, type_condition) {
                        self.apply_path(possible_types, value, remaining_path)
                    }
                }
                FetchNodePathSegment::Key(field_name) => {
                    if remaining_path.is_empty() {
                        if field_name != &self.rename_key_to {
                            if let Some(renamed) = obj.remove(field_name) {
                                obj.insert(self.rename_key_to.clone(), renamed);
                            }
                        }
                    } else if let Some(data) = obj.get_mut(field_name) {
                        self.apply_path(possible_types, data, remaining_path)
                    }
                }
            },
            // If the value is not an object or an array, we can't apply the rewrite.
            _ => (),
        }
    }
}

impl RewriteApplier for ValueSetter {
    fn apply(&self, possible_types: &PossibleTypes, data: &mut Value) {
        self.apply_path(possible_types, data, &self.path)
    }

    fn apply_path(
        &self,
        possible_types: &PossibleTypes,
        data: &mut Value,
        path: &[FetchNodePathSegment],
    ) {
        let Some((current_segment, remaining_path)) = path.split_first() else {
            *data = self.set_value_to.clone();
            return;
        };

        match data {
            Value::Array(arr) => {
                for data in arr {
                    self.apply_path(possible_types, data, path);
                }
            }
            Value::Object(map) => match current_segment {
                FetchNodePathSegment::TypenameEquals(type_condition) => {
                    if satisfies_guard(possible_types, map, type_condition) {
                        self.apply_path(possible_types, data, remaining_path)
                    }
                }
                FetchNodePathSegment::Key(field_name) => {
                    if let Some(data) = map.get_mut(field_name) {
                        self.apply_path(possible_types, data, remaining_path)
                    }
                }
            },
            // If the value is not an object or an array, we can't apply the rewrite.
            _ => (),
        }
    }
}
