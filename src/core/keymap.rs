//! Keymaps: per-mode remapping tables, looked up by name.
//!
//! A mode only knows the name of its keymap. Whoever hosts the engine
//! provides the tables through a [`KeyMapProvider`].

use std::collections::HashMap;

use tracing::warn;

use super::key::{parse_keys, KeyStroke};
use super::settings::Settings;

pub const NORMAL_KEYMAP: &str = "normal";
pub const INSERT_KEYMAP: &str = "insert";
pub const VISUAL_KEYMAP: &str = "visual";

/// Result of looking up a pending key sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMapMatch<'a> {
    /// The sequence is a complete left-hand side.
    Mapped(&'a [KeyStroke]),
    /// The sequence starts at least one longer left-hand side.
    Prefix,
    None,
}

#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    name: String,
    bindings: Vec<(Vec<KeyStroke>, Vec<KeyStroke>)>,
}

impl KeyMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds or replaces a binding. Empty left-hand sides are ignored.
    pub fn bind(&mut self, lhs: Vec<KeyStroke>, rhs: Vec<KeyStroke>) {
        if lhs.is_empty() {
            return;
        }
        if let Some(existing) = self.bindings.iter_mut().find(|(l, _)| *l == lhs) {
            existing.1 = rhs;
        } else {
            self.bindings.push((lhs, rhs));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Looks up `keys`. A sequence that is both mapped and a prefix of a
    /// longer mapping counts as a prefix, so the longer mapping can still
    /// complete.
    pub fn lookup(&self, keys: &[KeyStroke]) -> KeyMapMatch<'_> {
        let mut exact = None;
        for (lhs, rhs) in &self.bindings {
            if lhs.len() > keys.len() && lhs.starts_with(keys) {
                return KeyMapMatch::Prefix;
            }
            if lhs.as_slice() == keys {
                exact = Some(rhs.as_slice());
            }
        }
        match exact {
            Some(rhs) => KeyMapMatch::Mapped(rhs),
            None => KeyMapMatch::None,
        }
    }
}

/// Source of keymaps by name.
pub trait KeyMapProvider {
    fn key_map(&self, name: &str) -> Option<&KeyMap>;
}

/// Keymaps built from [`Settings::mappings`].
#[derive(Debug, Clone, Default)]
pub struct KeyMapRegistry {
    maps: HashMap<String, KeyMap>,
}

impl KeyMapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one keymap per table in `settings.mappings`. Bindings whose
    /// notation does not parse are skipped with a warning.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut registry = Self::new();
        for (name, table) in &settings.mappings {
            for (lhs, rhs) in table {
                match (parse_keys(lhs), parse_keys(rhs)) {
                    (Ok(lhs), Ok(rhs)) => registry.bind(name, lhs, rhs),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!(keymap = %name, lhs = %lhs, "skipping mapping: {e}");
                    }
                }
            }
        }
        registry
    }

    pub fn bind(&mut self, name: &str, lhs: Vec<KeyStroke>, rhs: Vec<KeyStroke>) {
        self.maps
            .entry(name.to_string())
            .or_insert_with(|| KeyMap::new(name))
            .bind(lhs, rhs);
    }

    pub fn insert(&mut self, map: KeyMap) {
        self.maps.insert(map.name().to_string(), map);
    }
}

impl KeyMapProvider for KeyMapRegistry {
    fn key_map(&self, name: &str) -> Option<&KeyMap> {
        self.maps.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(notation: &str) -> Vec<KeyStroke> {
        parse_keys(notation).unwrap()
    }

    #[test]
    fn test_lookup_prefix_and_match() {
        let mut map = KeyMap::new(INSERT_KEYMAP);
        map.bind(keys("jk"), keys("<Esc>"));

        assert_eq!(map.lookup(&keys("j")), KeyMapMatch::Prefix);
        assert_eq!(
            map.lookup(&keys("jk")),
            KeyMapMatch::Mapped(keys("<Esc>").as_slice())
        );
        assert_eq!(map.lookup(&keys("jj")), KeyMapMatch::None);
        assert_eq!(map.lookup(&keys("x")), KeyMapMatch::None);
    }

    #[test]
    fn test_longer_binding_wins_while_pending() {
        let mut map = KeyMap::new(NORMAL_KEYMAP);
        map.bind(keys("g"), keys("0"));
        map.bind(keys("gx"), keys("$"));
        assert_eq!(map.lookup(&keys("g")), KeyMapMatch::Prefix);
    }

    #[test]
    fn test_rebind_replaces() {
        let mut map = KeyMap::new(NORMAL_KEYMAP);
        map.bind(keys("Q"), keys("x"));
        map.bind(keys("Q"), keys("X"));
        assert_eq!(
            map.lookup(&keys("Q")),
            KeyMapMatch::Mapped(keys("X").as_slice())
        );
    }

    #[test]
    fn test_registry_from_settings_skips_bad_notation() {
        let mut settings = Settings::default();
        settings.map(INSERT_KEYMAP, "jk", "<Esc>");
        settings.map(INSERT_KEYMAP, "<Nope>", "x");
        let registry = KeyMapRegistry::from_settings(&settings);

        let insert = registry.key_map(INSERT_KEYMAP).unwrap();
        assert!(matches!(insert.lookup(&keys("jk")), KeyMapMatch::Mapped(_)));
        assert!(registry.key_map(NORMAL_KEYMAP).is_none());
    }
}
