//! Ordered, case-insensitive header multi-map.
//!
//! Keys are stored lowercase. Each key appears once, in first-seen order,
//! and owns the ordered list of its values (duplicates preserved).

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, keeping any values already present under the key.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let key = name.as_ref().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Values for a key, in arrival order.
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        let key = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, values)| values.as_slice())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_all(name).is_some()
    }

    /// Iterate over keys with their value lists.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    /// Iterate over every (key, value) pair, flattening multi-values.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(k, values)| {
            values.iter().map(move |v| (k.as_str(), v.as_str()))
        })
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.append(k, v);
        }
        headers
    }
}

impl From<&axum::http::HeaderMap> for Headers {
    fn from(map: &axum::http::HeaderMap) -> Self {
        map.iter()
            .map(|(name, value)| {
                (
                    name.as_str(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }
}

// Serialized as a JSON object of `name -> [values]` in insertion order.
impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, values) in &self.entries {
            map.serialize_entry(k, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(HeadersVisitor)
    }
}

struct HeadersVisitor;

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl<'de> Visitor<'de> for HeadersVisitor {
    type Value = Headers;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of header names to a value or list of values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
        let mut headers = Headers::new();
        while let Some((name, values)) = access.next_entry::<String, OneOrMany>()? {
            match values {
                OneOrMany::One(v) => headers.append(&name, v),
                OneOrMany::Many(vs) => {
                    for v in vs {
                        headers.append(&name, v);
                    }
                }
            }
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive_and_values_ordered() {
        let mut headers = Headers::new();
        headers.append("Accept", "text/html");
        headers.append("X-Trace", "a");
        headers.append("ACCEPT", "application/json");

        assert_eq!(headers.len(), 2);
        assert_eq!(
            headers.get_all("accept").unwrap(),
            ["text/html", "application/json"]
        );
        assert_eq!(headers.get("x-trace"), Some("a"));
        let keys: Vec<_> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["accept", "x-trace"]);
    }

    #[test]
    fn duplicates_are_preserved() {
        let headers: Headers = [("set-cookie", "a=1"), ("Set-Cookie", "a=1")]
            .into_iter()
            .collect();
        assert_eq!(headers.get_all("set-cookie").unwrap().len(), 2);
        assert_eq!(headers.pairs().count(), 2);
    }

    #[test]
    fn json_accepts_single_values_and_lists() {
        let headers: Headers =
            serde_json::from_str(r#"{"Content-Type": "text/plain", "Vary": ["a", "b"]}"#).unwrap();
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get_all("vary").unwrap(), ["a", "b"]);

        let json = serde_json::to_string(&headers).unwrap();
        assert_eq!(json, r#"{"content-type":["text/plain"],"vary":["a","b"]}"#);
    }
}
