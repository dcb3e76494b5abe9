use crate::error::Result;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Opaque user identifier used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Anything the host hands us that carries a stable user id.
pub trait Identity {
    fn id(&self) -> &str;

    fn user_id(&self) -> UserId {
        UserId::new(self.id())
    }
}

impl Identity for UserId {
    fn id(&self) -> &str {
        self.as_str()
    }
}

impl Identity for str {
    fn id(&self) -> &str {
        self
    }
}

impl Identity for String {
    fn id(&self) -> &str {
        self.as_str()
    }
}

/// One raw entry from a provider's badge list, tagged by JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawBadge {
    /// Bare badge string, used by generic providers.
    Plain(String),
    /// Fully described badge, used by the aggregator provider.
    Record { name: String, badge: String },
    /// Any other shape. Kept so one odd entry never poisons the document.
    Unrecognized(Value),
}

impl From<Value> for RawBadge {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => RawBadge::Plain(s),
            Value::Object(obj) => {
                let fields = match (obj.get("name"), obj.get("badge")) {
                    (Some(Value::String(name)), Some(Value::String(badge))) => {
                        Some((name.clone(), badge.clone()))
                    }
                    _ => None,
                };
                match fields {
                    Some((name, badge)) => RawBadge::Record { name, badge },
                    None => RawBadge::Unrecognized(Value::Object(obj)),
                }
            }
            other => RawBadge::Unrecognized(other),
        }
    }
}

impl From<&str> for RawBadge {
    fn from(s: &str) -> Self {
        RawBadge::Plain(s.to_string())
    }
}

impl From<String> for RawBadge {
    fn from(s: String) -> Self {
        RawBadge::Plain(s)
    }
}

/// Provider name to raw badge list, in the order the registry sent them.
///
/// A key appearing twice keeps its first position and its last value, which
/// is how a JavaScript `JSON.parse` of the same document behaves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderBadgeMap {
    providers: Vec<(String, Vec<RawBadge>)>,
    positions: HashMap<String, usize>,
}

impl ProviderBadgeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a registry `/users/{id}` response body.
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn insert(&mut self, provider: impl Into<String>, badges: Vec<RawBadge>) {
        let provider = provider.into();
        match self.positions.get(&provider) {
            Some(&pos) => self.providers[pos].1 = badges,
            None => {
                self.positions.insert(provider.clone(), self.providers.len());
                self.providers.push((provider, badges));
            }
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>, badges: Vec<RawBadge>) -> Self {
        self.insert(provider, badges);
        self
    }

    pub fn get(&self, provider: &str) -> Option<&[RawBadge]> {
        self.positions
            .get(provider)
            .map(|&pos| self.providers[pos].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RawBadge])> {
        self.providers
            .iter()
            .map(|(name, badges)| (name.as_str(), badges.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Serialize for ProviderBadgeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.providers.len()))?;
        for (provider, badges) in &self.providers {
            map.serialize_entry(provider, badges)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProviderBadgeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ProviderBadgeMapVisitor;

        impl<'de> Visitor<'de> for ProviderBadgeMapVisitor {
            type Value = ProviderBadgeMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping provider names to badge lists")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut out = ProviderBadgeMap::new();
                while let Some((provider, value)) = access.next_entry::<String, Value>()? {
                    // Non-array provider values carry no usable badges.
                    let badges = match value {
                        Value::Array(items) => items.into_iter().map(RawBadge::from).collect(),
                        _ => Vec::new(),
                    };
                    out.insert(provider, badges);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(ProviderBadgeMapVisitor)
    }
}

/// A render-ready (label, image) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayBadge {
    pub label: String,
    pub image_url: String,
}

impl DisplayBadge {
    pub fn new(label: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            image_url: image_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_preserves_provider_order() {
        let map = ProviderBadgeMap::from_json(
            r#"{"zeta": ["zeta early"], "alpha": ["alpha hunter"], "mid": []}"#,
        )
        .unwrap();
        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_decode_tags_entry_shapes() {
        let map = ProviderBadgeMap::from_json(
            r#"{"badgevault": [{"name": "Tester", "badge": "http://img/t.png"}, 42],
                "acme": ["acme hunter", {"name": 1}]}"#,
        )
        .unwrap();

        let vault = map.get("badgevault").unwrap();
        assert_eq!(
            vault[0],
            RawBadge::Record {
                name: "Tester".into(),
                badge: "http://img/t.png".into()
            }
        );
        assert!(matches!(vault[1], RawBadge::Unrecognized(_)));

        let acme = map.get("acme").unwrap();
        assert_eq!(acme[0], RawBadge::Plain("acme hunter".into()));
        assert!(matches!(acme[1], RawBadge::Unrecognized(_)));
    }

    #[test]
    fn test_non_array_provider_value_is_empty() {
        let map = ProviderBadgeMap::from_json(r#"{"acme": null, "other": "x"}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.get("acme").unwrap().is_empty());
        assert!(map.get("other").unwrap().is_empty());
    }

    #[test]
    fn test_top_level_array_is_rejected() {
        let err = ProviderBadgeMap::from_json(r#"["acme"]"#).unwrap_err();
        assert!(matches!(err, crate::BadgeError::Decode(_)));
    }

    #[test]
    fn test_duplicate_key_keeps_first_position_last_value() {
        let map = ProviderBadgeMap::from_json(
            r#"{"acme": ["acme early"], "beta": [], "acme": ["acme hunter"]}"#,
        )
        .unwrap();
        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["acme", "beta"]);
        assert_eq!(map.get("acme").unwrap(), &[RawBadge::from("acme hunter")]);
    }

    #[test]
    fn test_many_providers_keep_order_and_lookup() {
        let body = format!(
            "{{{}}}",
            (0..500)
                .map(|i| format!(r#""p{i}": ["p{i} early"]"#))
                .collect::<Vec<_>>()
                .join(",")
        );
        let map = ProviderBadgeMap::from_json(&body).unwrap();
        assert_eq!(map.len(), 500);
        assert_eq!(map.iter().nth(321).unwrap().0, "p321");
        assert_eq!(map.get("p499").unwrap(), &[RawBadge::from("p499 early")]);
        assert!(map.get("p500").is_none());
    }

    #[test]
    fn test_owned_string_converts_to_plain_badge() {
        let raw = format!("{} {}", "acme", "hunter");
        assert_eq!(RawBadge::from(raw), RawBadge::Plain("acme hunter".into()));
    }

    #[test]
    fn test_serialize_keeps_wire_shape() {
        let map = ProviderBadgeMap::new()
            .with_provider("acme", vec!["acme early".into()])
            .with_provider(
                "badgevault",
                vec![RawBadge::Record {
                    name: "Tester".into(),
                    badge: "http://img/t.png".into(),
                }],
            );
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(
            json,
            r#"{"acme":["acme early"],"badgevault":[{"name":"Tester","badge":"http://img/t.png"}]}"#
        );
    }

    #[test]
    fn test_identity_for_strings() {
        let owned = String::from("123");
        assert_eq!(owned.user_id(), UserId::from("123"));
        assert_eq!("456".user_id().as_str(), "456");
    }
}
