//! Caller-supplied fetch-policy overrides.

use crate::error::{CompileError, CompileResult};
use crate::metadata::{FetchPolicy, MappingKind};
use serde::Serialize;
use std::collections::HashMap;

/// Hint key overriding the fetch policy of every relationship.
pub const RELATIONSHIP_FETCH_HINT: &str = "objql.fetch.relationships";
/// Hint key overriding the fetch policy of plain columns.
pub const COLUMN_FETCH_HINT: &str = "objql.fetch.columns";

/// Fetch overrides applied during column expansion. `None` keeps the
/// policy declared in metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct QueryHints {
    pub relationship_fetch: Option<FetchPolicy>,
    pub column_fetch: Option<FetchPolicy>,
}

impl QueryHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relationships(mut self, policy: FetchPolicy) -> Self {
        self.relationship_fetch = Some(policy);
        self
    }

    pub fn columns(mut self, policy: FetchPolicy) -> Self {
        self.column_fetch = Some(policy);
        self
    }

    /// Read overrides from a hints map. Unknown keys are ignored; known keys
    /// with values other than `eager`/`lazy` are rejected.
    pub fn from_map(hints: &HashMap<String, String>) -> CompileResult<Self> {
        let parse = |key: &str| -> CompileResult<Option<FetchPolicy>> {
            match hints.get(key) {
                None => Ok(None),
                Some(value) => value.parse().map(Some).map_err(|_| CompileError::InvalidHint {
                    key: key.to_string(),
                    value: value.clone(),
                }),
            }
        };
        Ok(Self {
            relationship_fetch: parse(RELATIONSHIP_FETCH_HINT)?,
            column_fetch: parse(COLUMN_FETCH_HINT)?,
        })
    }

    /// Policy that applies to a field of the given mapping kind.
    pub fn effective(&self, mapping: MappingKind, declared: FetchPolicy) -> FetchPolicy {
        let over = if mapping.is_relationship() {
            self.relationship_fetch
        } else {
            self.column_fetch
        };
        over.unwrap_or(declared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_map() {
        let mut map = HashMap::new();
        map.insert(RELATIONSHIP_FETCH_HINT.to_string(), "LAZY".to_string());
        map.insert("unrelated".to_string(), "x".to_string());
        let hints = QueryHints::from_map(&map).unwrap();
        assert_eq!(hints.relationship_fetch, Some(FetchPolicy::Lazy));
        assert_eq!(hints.column_fetch, None);
    }

    #[test]
    fn test_invalid_hint() {
        let mut map = HashMap::new();
        map.insert(COLUMN_FETCH_HINT.to_string(), "sometimes".to_string());
        let err = QueryHints::from_map(&map).unwrap_err();
        assert!(matches!(err, CompileError::InvalidHint { .. }));
    }

    #[test]
    fn test_effective_policy() {
        let hints = QueryHints::new().relationships(FetchPolicy::Lazy);
        assert_eq!(hints.effective(MappingKind::ManyToOne, FetchPolicy::Eager), FetchPolicy::Lazy);
        assert_eq!(hints.effective(MappingKind::Column, FetchPolicy::Lazy), FetchPolicy::Lazy);
        assert_eq!(hints.effective(MappingKind::Column, FetchPolicy::Eager), FetchPolicy::Eager);
    }
}
