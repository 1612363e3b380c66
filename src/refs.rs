/// Link reference definitions collected during block parsing
use std::collections::HashMap;
use unicode_casefold::UnicodeCaseFold;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDefinition {
    pub destination: String,
    pub title: Option<String>,
}

#[derive(Debug, Default)]
pub struct LinkDefinitionMap {
    definitions: HashMap<String, LinkDefinition>,
}

/// Normalize a label for matching: Unicode case fold, trim, collapse whitespace
pub fn normalize_label(label: &str) -> String {
    let folded: String = label.chars().case_fold().collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl LinkDefinitionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition unless one already exists for the label.
    ///
    /// Returns whether the definition was stored.
    pub fn insert(&mut self, label: &str, definition: LinkDefinition) -> bool {
        let key = normalize_label(label);
        if key.is_empty() || self.definitions.contains_key(&key) {
            return false;
        }
        self.definitions.insert(key, definition);
        true
    }

    pub fn get(&self, label: &str) -> Option<&LinkDefinition> {
        self.definitions.get(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(destination: &str) -> LinkDefinition {
        LinkDefinition {
            destination: destination.to_string(),
            title: None,
        }
    }

    #[test]
    fn test_first_definition_wins() {
        let mut map = LinkDefinitionMap::new();
        assert!(map.insert("Foo  Bar", def("/first")));
        assert!(!map.insert("foo bar", def("/second")));
        assert_eq!(map.get(" FOO\tbar ").unwrap().destination, "/first");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_unicode_case_folding() {
        assert_eq!(normalize_label("ẞ"), normalize_label("SS"));
        assert_eq!(normalize_label("ΑΓΩ"), normalize_label("αγω"));
    }
}
