//! Routing-key autocomplete.
//!
//! Backs the editor suggester that offers component keys while the user
//! types a fence tag. Whether the suggester is shown at all (and whether
//! accepting a suggestion opens the argument modal) is governed by the
//! persisted `enableAutoComplete` / `autoCompleteOpenModal` flags; this
//! module only scores. Disabled components still suggest; the enabled
//! flag gates rendering, not discovery.

use std::sync::Arc;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::runtime::registry::Registry;

/// A routing key matching the typed prefix.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The routing key to insert.
    pub key: String,
    /// The definition's primary key name (differs when `key` is an alias).
    pub key_name: String,
    pub score: i64,
}

/// Fuzzy suggester over the registry's routing keys.
pub struct KeySuggester {
    registry: Arc<Registry>,
    matcher: SkimMatcherV2,
}

impl KeySuggester {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            matcher: SkimMatcherV2::default(),
        }
    }

    /// Score registered routing keys against `query`, best first. An empty
    /// query lists every key alphabetically.
    pub fn suggest(&self, query: &str) -> Vec<Suggestion> {
        let query = query.trim();

        if query.is_empty() {
            return self
                .registry
                .routing_keys()
                .into_iter()
                .map(|key| {
                    let key_name = self.key_name_of(&key);
                    Suggestion {
                        key,
                        key_name,
                        score: 0,
                    }
                })
                .collect();
        }

        let mut suggestions: Vec<Suggestion> = self
            .registry
            .routing_keys()
            .into_iter()
            .filter_map(|key| {
                self.matcher.fuzzy_match(&key, query).map(|score| {
                    let key_name = self.key_name_of(&key);
                    Suggestion {
                        key,
                        key_name,
                        score,
                    }
                })
            })
            .collect();

        suggestions.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
        suggestions
    }

    fn key_name_of(&self, key: &str) -> String {
        self.registry
            .resolve(key)
            .map(|definition| definition.key_name.clone())
            .unwrap_or_else(|| key.to_string())
    }
}
