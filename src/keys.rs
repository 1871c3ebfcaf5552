//! Namespaced key construction
//!
//! Every key is `app:module:<category>:<segments...>`. The category part
//! keeps scalar, set and list keys apart even when callers reuse the same
//! segment for all three.

use config::NamespaceConfig;
use std::fmt;

/// Separator placed between every key part
pub const SEPARATOR: &str = ":";

/// The three data shapes a key can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCategory {
    Value,
    Set,
    List,
}

impl KeyCategory {
    pub const ALL: [KeyCategory; 3] = [KeyCategory::Value, KeyCategory::Set, KeyCategory::List];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyCategory::Value => "value",
            KeyCategory::Set => "set",
            KeyCategory::List => "list",
        }
    }
}

impl fmt::Display for KeyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join key parts with [`SEPARATOR`]
pub fn build_key<S: AsRef<str>>(parts: &[S]) -> String {
    let parts: Vec<&str> = parts.iter().map(|part| part.as_ref()).collect();
    parts.join(SEPARATOR)
}

/// Application and module tag shared by all keys of one cache facade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    value_prefix: String,
    set_prefix: String,
    list_prefix: String,
}

impl KeyNamespace {
    pub fn new(app: &str, module: &str) -> Self {
        let prefix = |category: KeyCategory| build_key(&[app, module, category.as_str()]);
        Self {
            value_prefix: prefix(KeyCategory::Value),
            set_prefix: prefix(KeyCategory::Set),
            list_prefix: prefix(KeyCategory::List),
        }
    }

    /// Category prefix, e.g. `cb:users:set`
    pub fn prefix(&self, category: KeyCategory) -> &str {
        match category {
            KeyCategory::Value => &self.value_prefix,
            KeyCategory::Set => &self.set_prefix,
            KeyCategory::List => &self.list_prefix,
        }
    }

    /// Full key for a category and caller segments
    pub fn key<S: AsRef<str>>(&self, category: KeyCategory, segments: &[S]) -> String {
        let mut key = self.prefix(category).to_string();
        for segment in segments {
            key.push_str(SEPARATOR);
            key.push_str(segment.as_ref());
        }
        key
    }
}

impl From<&NamespaceConfig> for KeyNamespace {
    fn from(config: &NamespaceConfig) -> Self {
        Self::new(&config.app, &config.module)
    }
}

impl Default for KeyNamespace {
    fn default() -> Self {
        Self::from(&NamespaceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_build_key() {
        assert_eq!(build_key(&["a", "b", "c"]), "a:b:c");
        assert_eq!(build_key(&["single"]), "single");
        assert_eq!(build_key::<&str>(&[]), "");
        assert_eq!(build_key(&[String::from("x"), String::from("")]), "x:");
    }

    #[test]
    fn test_default_prefixes() {
        let namespace = KeyNamespace::default();
        assert_eq!(namespace.prefix(KeyCategory::Value), "cb:users:value");
        assert_eq!(namespace.prefix(KeyCategory::Set), "cb:users:set");
        assert_eq!(namespace.prefix(KeyCategory::List), "cb:users:list");
    }

    #[test]
    fn test_key_segments() {
        let namespace = KeyNamespace::new("shop", "orders");
        assert_eq!(
            namespace.key(KeyCategory::Value, &["login", "42"]),
            "shop:orders:value:login:42"
        );
        assert_eq!(namespace.key::<&str>(KeyCategory::List, &[]), "shop:orders:list");
    }

    #[test]
    fn test_categories_never_collide() {
        let namespace = KeyNamespace::default();
        for segment in ["", "token", "value", "set:x", "a:b:c"] {
            let keys: HashSet<String> = KeyCategory::ALL
                .iter()
                .map(|category| namespace.key(*category, &[segment]))
                .collect();
            assert_eq!(keys.len(), 3, "collision for segment {:?}", segment);
        }
    }

    #[test]
    fn test_from_config() {
        let config = NamespaceConfig::new("cb".to_string(), "orders".to_string());
        let namespace = KeyNamespace::from(&config);
        assert_eq!(namespace.prefix(KeyCategory::Set), "cb:orders:set");
    }
}
