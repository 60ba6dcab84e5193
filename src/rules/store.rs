//! Shared rule store
//!
//! Holds the active [`RuleSet`] behind a reader/writer lock. The lock guards
//! only an `Arc` handle: lookups clone the handle and scan outside the lock,
//! reloads build the new set elsewhere and swap the handle in. A lookup
//! therefore sees exactly one version of the rules, never a mixture.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use super::rule::Rule;
use crate::common::{ResponderError, Result};

/// Ordered list of rules; the first match wins
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Create an empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// First rule whose condition accepts `input`
    pub fn first_match(&self, input: &[u8]) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(input))
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate the rules in match order
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Add a rule at the end
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// Concurrency-safe holder of the active rule set
#[derive(Debug, Default)]
pub struct RuleStore {
    active: RwLock<Arc<RuleSet>>,
}

impl RuleStore {
    /// Create a store holding an empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given rules
    pub fn with_rules(rules: RuleSet) -> Self {
        Self {
            active: RwLock::new(Arc::new(rules)),
        }
    }

    // A panic while holding the lock cannot leave a half-written set behind
    // (the guarded value is a single Arc), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Arc<RuleSet>> {
        self.active.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<RuleSet>> {
        self.active.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Current rule set as an immutable snapshot
    pub fn snapshot(&self) -> Arc<RuleSet> {
        Arc::clone(&self.read())
    }

    /// Find the first rule matching `input`
    pub fn lookup(&self, input: &[u8]) -> Option<Rule> {
        self.snapshot().first_match(input).cloned()
    }

    /// Response bytes of the first matching rule
    pub fn build_response(&self, input: &[u8]) -> Result<Vec<u8>> {
        self.lookup(input)
            .map(|rule| rule.response().to_vec())
            .ok_or(ResponderError::NoMatch)
    }

    /// Swap in a fully built rule set; returns the new rule count
    pub fn replace(&self, rules: RuleSet) -> usize {
        let rules = Arc::new(rules);
        let count = rules.len();
        let previous = std::mem::replace(&mut *self.write(), rules);
        debug!("Rule set replaced ({} -> {} rules)", previous.len(), count);
        count
    }

    /// Append one rule to the active set
    pub fn append(&self, rule: Rule) {
        let mut active = self.write();
        Arc::make_mut(&mut active).push(rule);
    }

    /// Number of active rules
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no rules are active
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn rules(pairs: &[(&str, &str)]) -> RuleSet {
        pairs
            .iter()
            .map(|(pattern, response)| Rule::regex(pattern, *response).unwrap())
            .collect()
    }

    #[test]
    fn test_first_match_wins() {
        let store = RuleStore::with_rules(rules(&[("ab", "first"), ("a", "second"), (".*", "last")]));

        assert_eq!(store.lookup(b"xaby").unwrap().response(), b"first");
        assert_eq!(store.lookup(b"xa").unwrap().response(), b"second");
        assert_eq!(store.lookup(b"zzz").unwrap().response(), b"last");
    }

    #[test]
    fn test_empty_store_finds_nothing() {
        let store = RuleStore::new();
        assert!(store.is_empty());
        assert!(store.lookup(b"anything").is_none());
        assert!(matches!(
            store.build_response(b"anything"),
            Err(ResponderError::NoMatch)
        ));
    }

    #[test]
    fn test_append_goes_last() {
        let store = RuleStore::with_rules(rules(&[("x", "x-rule")]));
        store.append(Rule::contains("x", "shadowed"));
        store.append(Rule::contains("y", "y-rule"));

        assert_eq!(store.len(), 3);
        assert_eq!(store.build_response(b"x").unwrap(), b"x-rule");
        assert_eq!(store.build_response(b"y").unwrap(), b"y-rule");
    }

    #[test]
    fn test_append_does_not_touch_existing_snapshots() {
        let store = RuleStore::with_rules(rules(&[("a", "1")]));
        let before = store.snapshot();
        store.append(Rule::contains("b", "2"));

        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_replace_swaps_whole_set() {
        let store = RuleStore::with_rules(rules(&[("old", "old-response")]));
        let count = store.replace(rules(&[("new", "new-response"), ("new2", "x")]));

        assert_eq!(count, 2);
        assert!(store.lookup(b"old").is_none());
        assert_eq!(store.build_response(b"new").unwrap(), b"new-response");
    }

    #[test]
    fn test_concurrent_lookups_see_whole_versions() {
        // Version A answers every request with "A", version B with "B". A reader
        // that ever mixed versions would see a response of the wrong letter
        // for some request within one snapshot.
        let version = |tag: &str| -> RuleSet {
            (0..20)
                .map(|i| Rule::contains(&format!("k{i:02}"), tag.to_string()))
                .collect()
        };

        let store = Arc::new(RuleStore::with_rules(version("A")));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let snapshot = store.snapshot();
                        let first = snapshot.first_match(b"k00").unwrap().response().to_vec();
                        for i in 0..20 {
                            let key = format!("k{i:02}");
                            let got = snapshot.first_match(key.as_bytes()).unwrap();
                            assert_eq!(got.response(), first.as_slice());
                        }
                    }
                })
            })
            .collect();

        for i in 0..200 {
            store.replace(version(if i % 2 == 0 { "B" } else { "A" }));
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
