use std::cmp::Ordering;
use strata_types::Entity;

/// What a sort step compares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderKey {
    /// [`strata_types::Identifier::order_cmp`].
    Identifier,
    /// An indexed property. Entities without a value sort after those with one.
    Index(String),
    /// Keep insertion/fetch order.
    Natural,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// One sort step. A query's orderings are applied in sequence, each breaking
/// the ties of the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Order {
    pub key: OrderKey,
    pub direction: Direction,
}

impl Order {
    pub fn asc(key: OrderKey) -> Self {
        Self {
            key,
            direction: Direction::Ascending,
        }
    }

    pub fn desc(key: OrderKey) -> Self {
        Self {
            key,
            direction: Direction::Descending,
        }
    }

    pub fn by_index(index: impl Into<String>, direction: Direction) -> Self {
        Self {
            key: OrderKey::Index(index.into()),
            direction,
        }
    }

    fn compare<E: Entity>(&self, a: &E, b: &E) -> Ordering {
        let ordering = match &self.key {
            OrderKey::Natural => return Ordering::Equal,
            OrderKey::Identifier => a.identifier().order_cmp(b.identifier()),
            OrderKey::Index(index) => match (a.index_value(index), b.index_value(index)) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        match self.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

/// Stable sort by `orders`; with no orders the input order is kept.
pub(crate) fn sort_entities<E: Entity>(orders: &[Order], entities: &mut [E]) {
    if orders.iter().all(|o| o.key == OrderKey::Natural) {
        return;
    }
    entities.sort_by(|a, b| {
        orders
            .iter()
            .map(|o| o.compare(a, b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}
