use strata_types::{Entity, Identifier};

use crate::filter::Filter;
use crate::order::{sort_entities, Order};

/// A slice of an ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Page {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    fn slice<E>(&self, entities: Vec<E>) -> Vec<E> {
        let iter = entities.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// An immutable (filter, ordering, pagination) triple.
///
/// Structural equality decides whether two observers watch the same query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Query {
    filter: Filter,
    order: Vec<Order>,
    page: Option<Page>,
}

impl Query {
    /// Every entity, in natural order.
    pub fn all() -> Self {
        Self::default()
    }

    /// The single record named by `identifier`.
    pub fn identifier(identifier: Identifier) -> Self {
        Self::filtered(Filter::IdentifierEquals(identifier))
    }

    /// The records named by `identifiers`.
    pub fn identifiers(identifiers: impl IntoIterator<Item = Identifier>) -> Self {
        Self::filtered(Filter::identifiers(identifiers))
    }

    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Appends a sort step.
    #[must_use]
    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// The same query without pagination.
    #[must_use]
    pub fn without_page(&self) -> Self {
        Self {
            page: None,
            ..self.clone()
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn order(&self) -> &[Order] {
        &self.order
    }

    pub fn page(&self) -> Option<Page> {
        self.page
    }

    pub fn is_paginated(&self) -> bool {
        self.page.is_some()
    }

    /// The identifier when this is a single-record lookup.
    pub fn single_identifier(&self) -> Option<&Identifier> {
        match &self.filter {
            Filter::IdentifierEquals(id) => Some(id),
            _ => None,
        }
    }

    /// Whether `entity` passes the filter (pagination not considered).
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        self.filter.evaluate(entity)
    }

    /// Keeps the entities passing the filter, in query order.
    pub fn filter_and_sort<E: Entity>(&self, entities: impl IntoIterator<Item = E>) -> Vec<E> {
        let mut matching: Vec<E> = entities
            .into_iter()
            .filter(|e| self.filter.evaluate(e))
            .collect();
        sort_entities(&self.order, &mut matching);
        matching
    }

    /// Filters, sorts and paginates `entities`.
    pub fn apply<E: Entity>(&self, entities: impl IntoIterator<Item = E>) -> Vec<E> {
        let sorted = self.filter_and_sort(entities);
        match &self.page {
            Some(page) => page.slice(sorted),
            None => sorted,
        }
    }

    /// Re-sorts already filtered entities.
    pub fn sort<E: Entity>(&self, entities: &mut [E]) {
        sort_entities(&self.order, entities);
    }
}
