use serde::{Deserialize, Serialize};
use strata_types::{Entity, Identifier};

/// How much of the truth a result represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultScope {
    /// The full answer set for its query. A record missing from it no
    /// longer satisfies the query.
    Complete,
    /// Narrowed by context the query does not describe (e.g. an endpoint
    /// applying extra filtering). Absence means nothing.
    Contextual,
    /// One page of a larger answer. Absence means nothing.
    Paginated,
}

/// The outcome of evaluating a query at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<E> {
    entities: Vec<E>,
    scope: ResultScope,
    metadata: Option<serde_json::Value>,
}

impl<E> QueryResult<E> {
    pub fn new(entities: Vec<E>, scope: ResultScope) -> Self {
        Self {
            entities,
            scope,
            metadata: None,
        }
    }

    pub fn complete(entities: Vec<E>) -> Self {
        Self::new(entities, ResultScope::Complete)
    }

    pub fn contextual(entities: Vec<E>) -> Self {
        Self::new(entities, ResultScope::Contextual)
    }

    pub fn paginated(entities: Vec<E>) -> Self {
        Self::new(entities, ResultScope::Paginated)
    }

    /// An empty result that makes no claim about absent records.
    pub fn empty() -> Self {
        Self::contextual(Vec::new())
    }

    /// Attaches endpoint metadata (passed through, not interpreted).
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: ResultScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    pub fn scope(&self) -> ResultScope {
        self.scope
    }

    pub fn is_complete(&self) -> bool {
        self.scope == ResultScope::Complete
    }

    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    pub fn into_entities(self) -> Vec<E> {
        self.entities
    }

    /// The first entity, for single-record lookups.
    pub fn entity(&self) -> Option<&E> {
        self.entities.first()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.entities.iter()
    }

    /// Same scope and metadata, different entities.
    pub fn replace_entities<F>(&self, entities: Vec<F>) -> QueryResult<F> {
        QueryResult {
            entities,
            scope: self.scope,
            metadata: self.metadata.clone(),
        }
    }
}

impl<E: Entity> QueryResult<E> {
    /// Whether a record naming the same entity as `identifier` is present.
    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.entities
            .iter()
            .any(|e| e.identifier().matches(identifier))
    }

    pub fn identifiers(&self) -> Vec<Identifier> {
        self.entities
            .iter()
            .map(|e| e.identifier().clone())
            .collect()
    }
}

impl<E> IntoIterator for QueryResult<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a QueryResult<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}
