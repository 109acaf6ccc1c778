//! Filter algebra.

use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use strata_types::{Entity, Identifier, IndexValue};

/// A compiled regular expression compared by its source text.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compiles a pattern.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(source)?,
        })
    }

    /// The pattern source.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

/// A predicate over entities.
///
/// Index-based variants read the entity through [`Entity::index_value`];
/// an entity without a value for the index never satisfies them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Every entity.
    #[default]
    All,
    /// The entity's identifier names the same record (see [`Identifier::matches`]).
    IdentifierEquals(Identifier),
    /// The entity's identifier names one of these records.
    IdentifierIn(Vec<Identifier>),
    Equals { index: String, value: IndexValue },
    In { index: String, values: Vec<IndexValue> },
    /// A text index matches the pattern.
    Matches { index: String, pattern: Pattern },
    GreaterThan { index: String, value: IndexValue },
    LessThan { index: String, value: IndexValue },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn identifier(identifier: Identifier) -> Self {
        Self::IdentifierEquals(identifier)
    }

    pub fn identifiers(identifiers: impl IntoIterator<Item = Identifier>) -> Self {
        Self::IdentifierIn(identifiers.into_iter().collect())
    }

    pub fn equals(index: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self::Equals {
            index: index.into(),
            value: value.into(),
        }
    }

    pub fn one_of<V: Into<IndexValue>>(
        index: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            index: index.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Regex filter on a text index. Fails if the pattern does not compile.
    pub fn matches(index: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Matches {
            index: index.into(),
            pattern: Pattern::new(pattern)?,
        })
    }

    pub fn greater_than(index: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self::GreaterThan {
            index: index.into(),
            value: value.into(),
        }
    }

    pub fn less_than(index: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        Self::LessThan {
            index: index.into(),
            value: value.into(),
        }
    }

    /// Conjunction, flattening nested `And`s and dropping `All`.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        let mut parts = Vec::new();
        for f in [self, other] {
            match f {
                Self::All => {}
                Self::And(inner) => parts.extend(inner),
                f => parts.push(f),
            }
        }
        match parts.len() {
            0 => Self::All,
            1 => parts.remove(0),
            _ => Self::And(parts),
        }
    }

    #[must_use]
    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Self::All, _) | (_, Self::All) => Self::All,
            (Self::Or(mut a), Self::Or(b)) => {
                a.extend(b);
                Self::Or(a)
            }
            (Self::Or(mut a), b) => {
                a.push(b);
                Self::Or(a)
            }
            (a, b) => Self::Or(vec![a, b]),
        }
    }

    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            f => Self::Not(Box::new(f)),
        }
    }

    /// Whether `entity` satisfies this filter.
    pub fn evaluate<E: Entity>(&self, entity: &E) -> bool {
        match self {
            Self::All => true,
            Self::IdentifierEquals(id) => entity.identifier().matches(id),
            Self::IdentifierIn(ids) => ids.iter().any(|id| entity.identifier().matches(id)),
            Self::Equals { index, value } => entity.index_value(index).as_ref() == Some(value),
            Self::In { index, values } => entity
                .index_value(index)
                .is_some_and(|v| values.contains(&v)),
            Self::Matches { index, pattern } => entity
                .index_value(index)
                .as_ref()
                .and_then(IndexValue::as_text)
                .is_some_and(|text| pattern.is_match(text)),
            Self::GreaterThan { index, value } => entity
                .index_value(index)
                .is_some_and(|v| same_kind(&v, value) && v > *value),
            Self::LessThan { index, value } => entity
                .index_value(index)
                .is_some_and(|v| same_kind(&v, value) && v < *value),
            Self::And(filters) => filters.iter().all(|f| f.evaluate(entity)),
            Self::Or(filters) => filters.iter().any(|f| f.evaluate(entity)),
            Self::Not(inner) => !inner.evaluate(entity),
        }
    }
}

fn same_kind(a: &IndexValue, b: &IndexValue) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}
