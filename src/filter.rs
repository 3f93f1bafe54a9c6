//! Tag filter expressions
//!
//! Parses the query-side tag filter grammar into an explicit structure so
//! the set algebra is testable in isolation from storage:
//!
//! ```text
//! filter = clause (" " clause)*
//! clause = tag_key "=" value ("," value)*
//! ```
//!
//! Each clause is an OR over its value list; distinct clauses are ANDed.
//! `"region=georgia,turkey well=a3,a4,b4"` means
//! `(region ∈ {georgia, turkey}) AND (well ∈ {a3, a4, b4})`.

use crate::error::Error;
use crate::types::TagSet;
use std::collections::BTreeSet;

/// One parsed clause: a tag key and the set of acceptable values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagClause {
    /// Tag key the clause constrains
    pub key: String,
    /// Acceptable values (OR semantics)
    pub values: BTreeSet<String>,
}

impl TagClause {
    /// Whether a tag set satisfies this clause
    pub fn matches(&self, tags: &TagSet) -> bool {
        tags.get(&self.key)
            .is_some_and(|value| self.values.contains(value))
    }
}

/// A parsed conjunctive tag filter
///
/// An empty filter (no clauses) matches every event of the metric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    /// Clauses, all of which must match
    pub clauses: Vec<TagClause>,
}

impl TagFilter {
    /// Parse a filter expression
    ///
    /// Whitespace-only input yields the empty (match-all) filter. Returns
    /// `Error::MalformedFilter` for clauses without `=`, empty keys, empty
    /// value lists, or repeated `=` inside a clause.
    pub fn parse(expression: &str) -> Result<Self, Error> {
        let mut clauses = Vec::new();

        for raw in expression.split_whitespace() {
            let (key, values) = raw.split_once('=').ok_or_else(|| {
                Error::MalformedFilter(format!("clause '{}' is missing '='", raw))
            })?;

            if key.is_empty() {
                return Err(Error::MalformedFilter(format!(
                    "clause '{}' has an empty tag key",
                    raw
                )));
            }
            if values.contains('=') {
                return Err(Error::MalformedFilter(format!(
                    "clause '{}' contains more than one '='",
                    raw
                )));
            }

            let values: BTreeSet<String> = values
                .split(',')
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();

            if values.is_empty() {
                return Err(Error::MalformedFilter(format!(
                    "clause '{}' lists no values",
                    raw
                )));
            }

            clauses.push(TagClause {
                key: key.to_string(),
                values,
            });
        }

        Ok(Self { clauses })
    }

    /// Whether this filter matches every event (no clauses)
    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether a tag set satisfies every clause
    pub fn matches(&self, tags: &TagSet) -> bool {
        self.clauses.iter().all(|clause| clause.matches(tags))
    }
}
