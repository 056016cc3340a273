use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// An entity type whose derived copies live in the cache.
///
/// Every key derived from a resource starts with its name, so a resource owns
/// two disjoint namespaces: `{name}:detail:` and `{name}:list:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resource(&'static str);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyKind {
    Detail,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    resource: Resource,
    kind: KeyKind,
    key: String,
}

/// Normalized query parameters of a list read.
///
/// Parameters are kept sorted by name, a later value for the same name replaces
/// the earlier one and `None` removes the parameter, so `{city: None}` and `{}`
/// are the same query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams(BTreeMap<&'static str, String>);

impl Resource {
    pub const fn new(name: &'static str) -> Self {
        let bytes = name.as_bytes();
        assert!(!bytes.is_empty(), "resource name must not be empty");

        let mut i = 0;
        while i < bytes.len() {
            assert!(bytes[i] != b':', "resource name must not contain ':'");
            i += 1;
        }

        Self(name)
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.0
    }

    pub fn detail(&self, id: impl Display) -> CacheKey {
        CacheKey {
            resource: *self,
            kind: KeyKind::Detail,
            key: format!("{}{}", self.namespace(KeyKind::Detail), id),
        }
    }

    pub fn list(&self, params: &FilterParams) -> CacheKey {
        CacheKey {
            resource: *self,
            kind: KeyKind::List,
            key: format!("{}{}", self.namespace(KeyKind::List), params.digest()),
        }
    }

    /// Prefix shared by every key of `kind` for this resource.
    pub fn namespace(&self, kind: KeyKind) -> String {
        format!("{}:{}:", self.0, kind.as_str())
    }
}

impl KeyKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            KeyKind::Detail => "detail",
            KeyKind::List => "list",
        }
    }
}

impl CacheKey {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    #[inline]
    pub fn resource(&self) -> Resource {
        self.resource
    }
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: Option<impl Display>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &'static str, value: Option<impl Display>) {
        match value {
            Some(value) => {
                self.0.insert(name, value.to_string());
            }
            None => {
                self.0.remove(name);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stable encoding: a JSON object with the parameters in name order.
    pub fn encode(&self) -> String {
        let pairs = self
            .0
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}:{}",
                    serde_json::Value::from(*name),
                    serde_json::Value::from(value.as_str())
                )
            })
            .collect::<Vec<String>>();

        format!("{{{}}}", pairs.join(","))
    }

    pub fn digest(&self) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(Sha256::digest(self.encode().as_bytes()))
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const SPOTS: Resource = Resource::new("spot");
    const HOTELS: Resource = Resource::new("hotel");

    const NAMES: &[&str] = &["city", "state", "country", "search", "skip", "limit"];

    #[test]
    fn detail_key_layout() {
        let key = SPOTS.detail(42);
        assert_eq!(key.as_str(), "spot:detail:42");
        assert_eq!(key.kind(), KeyKind::Detail);
        assert_eq!(key.resource(), SPOTS);
    }

    #[test]
    fn list_key_lives_in_list_namespace() {
        let key = SPOTS.list(&FilterParams::new().with("city", Some("Rio")));
        assert!(key.as_str().starts_with(&SPOTS.namespace(KeyKind::List)));
        assert!(!key.as_str().starts_with(&SPOTS.namespace(KeyKind::Detail)));
        assert_eq!(key.kind(), KeyKind::List);
    }

    #[test]
    fn namespaces_are_disjoint_across_resources() {
        assert_ne!(SPOTS.namespace(KeyKind::List), HOTELS.namespace(KeyKind::List));
        assert_ne!(SPOTS.detail(1), HOTELS.detail(1));
    }

    #[test]
    fn absent_values_are_omitted() {
        let none: Option<&str> = None;
        let a = FilterParams::new().with("city", none).with("limit", Some(20));
        let b = FilterParams::new().with("limit", Some(20));
        assert_eq!(SPOTS.list(&a), SPOTS.list(&b));
    }

    #[test]
    fn last_value_wins() {
        let a = FilterParams::new()
            .with("city", Some("Lima"))
            .with("city", Some("Rio"));
        let b = FilterParams::new().with("city", Some("Rio"));
        assert_eq!(a.encode(), b.encode());
    }

    #[test]
    fn values_are_not_case_folded() {
        let a = FilterParams::new().with("city", Some("rio"));
        let b = FilterParams::new().with("city", Some("Rio"));
        assert_ne!(SPOTS.list(&a), SPOTS.list(&b));
    }

    #[test]
    fn encoding_escapes_separators() {
        let a = FilterParams::new().with("search", Some(r#"a","city":"b"#));
        let b = FilterParams::new()
            .with("search", Some("a"))
            .with("city", Some("b"));
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    #[should_panic(expected = "must not contain ':'")]
    fn resource_name_rejects_separator() {
        let _ = Resource::new("spot:list");
    }

    fn params_in_two_orders()
    -> impl Strategy<Value = (Vec<(&'static str, String)>, Vec<(&'static str, String)>)> {
        prop::collection::btree_map(prop::sample::select(NAMES), "[a-zA-Z0-9 ]{0,12}", 0..6)
            .prop_flat_map(|params| {
                let ordered = params.into_iter().collect::<Vec<_>>();
                (Just(ordered.clone()), Just(ordered).prop_shuffle())
            })
    }

    fn build(pairs: Vec<(&'static str, String)>) -> FilterParams {
        pairs
            .into_iter()
            .fold(FilterParams::new(), |params, (name, value)| {
                params.with(name, Some(value))
            })
    }

    proptest! {
        #[test]
        fn permutations_collide((ordered, shuffled) in params_in_two_orders()) {
            prop_assert_eq!(SPOTS.list(&build(ordered)), SPOTS.list(&build(shuffled)));
        }
    }
}
