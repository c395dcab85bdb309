use crate::{
    response::graphql_error::{GraphQLError, GraphQLErrorPath, GraphQLErrorPathSegment},
    utils::consts::{DOWNSTREAM_SERVICE_ERROR_CODE, ENTITIES_FIELD_NAME},
};

/// Errors of a fetch with no entity dimension.
/// Only errors reported without a path are moved, to the default path of the fetch.
pub fn relocate_root_errors(
    errors: Vec<GraphQLError>,
    default_path: Option<&GraphQLErrorPath>,
) -> Vec<GraphQLError> {
    errors
        .into_iter()
        .map(|error| match (&error.path, default_path) {
            (None, Some(default_path)) => error.with_path(default_path.clone()),
            _ => error,
        })
        .collect()
}

/**
 * Map `[_entities, 0, field]` to `[...entity_path, field]`;
 *
 * Representations are deduplicated, so one entity index can stand for several
 * entities in the response. The error is copied once for each of them.
 *
 * For example, if the error location is `[_entities, 0, name]`,
 * and `product.reviews.0.author` and `product.reviews.3.author` were both
 * deduplicated into the first representation, the result is two errors, at
 * `["product", "reviews", 0, "author", "name"]` and `["product", "reviews", 3, "author", "name"]`.
 *
 * Anything else goes to the default path of the fetch, or is kept as reported.
 */
pub fn relocate_flatten_errors(
    errors: Vec<GraphQLError>,
    entity_paths: &[GraphQLErrorPath],
    representation_order: &[usize],
    default_path: Option<&GraphQLErrorPath>,
) -> Vec<GraphQLError> {
    let mut relocated = Vec::with_capacity(errors.len());

    for error in errors {
        if let Some((entity_index, rest)) = entity_location(&error) {
            let mut copies = entity_paths
                .iter()
                .zip(representation_order)
                .filter(|(_, order)| **order == entity_index)
                .map(|(entity_path, _)| error.clone().with_path(entity_path.concat_segments(rest)))
                .peekable();

            if copies.peek().is_some() {
                relocated.extend(copies);
                continue;
            }
        }

        relocated.push(fallback(error, default_path));
    }

    relocated
}

/// Errors of a fetch that received an explicit list of entities.
/// `_entities[i]` belongs to `entity_paths[i]`.
pub fn relocate_entity_errors(
    errors: Vec<GraphQLError>,
    entity_paths: &[GraphQLErrorPath],
    default_path: Option<&GraphQLErrorPath>,
) -> Vec<GraphQLError> {
    errors
        .into_iter()
        .map(|error| {
            let mapped = entity_location(&error).and_then(|(entity_index, rest)| {
                entity_paths
                    .get(entity_index)
                    .map(|entity_path| entity_path.concat_segments(rest))
            });

            match mapped {
                Some(path) => error.with_path(path),
                None => fallback(error, default_path),
            }
        })
        .collect()
}

pub fn add_subgraph_info_to_error(mut error: GraphQLError, subgraph_name: &str) -> GraphQLError {
    let mut extensions = error.extensions.unwrap_or_default();
    if !extensions.contains_key("serviceName") {
        extensions.insert("serviceName".to_string(), subgraph_name.into());
    }
    if !extensions.contains_key("code") {
        extensions.insert("code".to_string(), DOWNSTREAM_SERVICE_ERROR_CODE.into());
    }
    error.extensions = Some(extensions);
    error
}

/// Finds `_entities, <index>` in the error path and returns the index
/// with whatever follows it.
fn entity_location(error: &GraphQLError) -> Option<(usize, &[GraphQLErrorPathSegment])> {
    let segments = &error.path.as_ref()?.segments;
    let position = segments.iter().position(|segment| {
        matches!(segment, GraphQLErrorPathSegment::String(key) if key == ENTITIES_FIELD_NAME)
    })?;

    match segments.get(position + 1) {
        Some(GraphQLErrorPathSegment::Index(entity_index)) => {
            Some((*entity_index, &segments[position + 2..]))
        }
        _ => None,
    }
}

fn fallback(error: GraphQLError, default_path: Option<&GraphQLErrorPath>) -> GraphQLError {
    match default_path {
        Some(path) => error.with_path(path.clone()),
        None => error,
    }
}
