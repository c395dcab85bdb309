use std::{
    hash::{Hash, Hasher},
    sync::Arc,
};

use dashmap::DashMap;
use graphql_parser::query::{Definition, Document, OperationDefinition, Selection, SelectionSet};
use tracing::trace;
use xxhash_rust::xxh3::Xxh3;

use crate::{
    execution::error::PlanExecutionError,
    response::graphql_error::{GraphQLErrorPath, GraphQLErrorPathSegment},
};

pub type FetchDocument = Arc<Document<'static, String>>;

/// Memoizations keyed by plan content, shared by every request of one executor.
/// Entries are never replaced: the first insert for a key wins.
#[derive(Default)]
pub struct FetchCaches {
    documents: DashMap<u64, FetchDocument>,
    default_error_paths: DashMap<u64, Option<GraphQLErrorPath>>,
}

fn content_hash(parts: &[&str]) -> u64 {
    let mut hasher = Xxh3::new();
    for part in parts {
        part.hash(&mut hasher);
    }
    hasher.finish()
}

impl FetchCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed form of a fetch operation.
    pub fn document(
        &self,
        service_name: &str,
        operation: &str,
    ) -> Result<FetchDocument, PlanExecutionError> {
        let key = content_hash(&[operation]);
        if let Some(document) = self.documents.get(&key) {
            return Ok(document.value().clone());
        }

        trace!(service_name, "parsing fetch operation");
        let document = graphql_parser::parse_query::<String>(operation)
            .map_err(|e| {
                PlanExecutionError::InvalidFetchOperation(service_name.to_string(), e.to_string())
            })?
            .into_static();

        Ok(self
            .documents
            .entry(key)
            .or_insert(Arc::new(document))
            .value()
            .clone())
    }

    /// Where errors reported without a path are placed.
    pub fn default_error_path(
        &self,
        service_name: &str,
        operation: &str,
        document: &Document<'static, String>,
    ) -> Option<GraphQLErrorPath> {
        let key = content_hash(&[service_name, operation]);
        self.default_error_paths
            .entry(key)
            .or_insert_with(|| compute_default_error_path(document))
            .value()
            .clone()
    }

    pub fn documents_len(&self) -> usize {
        self.documents.len()
    }
}

/// The response key of the only root field.
/// Operations selecting several root fields have no default path.
fn compute_default_error_path(document: &Document<'static, String>) -> Option<GraphQLErrorPath> {
    let selection_set = document
        .definitions
        .iter()
        .find_map(|definition| match definition {
            Definition::Operation(operation) => Some(operation_selection_set(operation)),
            Definition::Fragment(_) => None,
        })?;

    match selection_set.items.as_slice() {
        [Selection::Field(field)] => {
            let response_key = field.alias.as_ref().unwrap_or(&field.name);
            Some(GraphQLErrorPath::from(vec![GraphQLErrorPathSegment::String(
                response_key.clone(),
            )]))
        }
        _ => None,
    }
}

fn operation_selection_set<'a>(
    operation: &'a OperationDefinition<'static, String>,
) -> &'a SelectionSet<'static, String> {
    match operation {
        OperationDefinition::SelectionSet(selection_set) => selection_set,
        OperationDefinition::Query(query) => &query.selection_set,
        OperationDefinition::Mutation(mutation) => &mutation.selection_set,
        OperationDefinition::Subscription(subscription) => &subscription.selection_set,
    }
}
