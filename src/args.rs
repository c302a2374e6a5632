//! Request argument merging and coercion.
//!
//! Arguments arrive from three places: cookies, the query string and (for JSON
//! or form-encoded requests) the body. They are merged into one map with later
//! sources winning on key collision: cookies < query < body.
//!
//! Values stay raw until an action binds them. At binding time each string is
//! tried as a JSON literal, so `?limit=10` binds as the number `10` while
//! `?name=hello` stays the string `"hello"`.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Merged request arguments, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestArgs {
    values: HashMap<String, Value>,
}

impl RequestArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge cookies, query parameters and an optional body.
    ///
    /// `body` is only consulted when it is a JSON object; any other shape (a
    /// bare array or scalar) carries no named arguments and is ignored.
    #[must_use]
    pub fn merge(
        cookies: &HashMap<String, String>,
        query: &HashMap<String, String>,
        body: Option<&Value>,
    ) -> Self {
        let mut args = Self::new();
        args.extend_strings(cookies);
        args.extend_strings(query);
        if let Some(Value::Object(map)) = body {
            args.extend_json(map);
        }
        args
    }

    /// Insert string values, overriding existing keys.
    pub fn extend_strings(&mut self, values: &HashMap<String, String>) {
        for (k, v) in values {
            self.values.insert(k.clone(), Value::String(v.clone()));
        }
    }

    /// Insert JSON values, overriding existing keys.
    pub fn extend_json(&mut self, values: &Map<String, Value>) {
        for (k, v) in values {
            self.values.insert(k.clone(), v.clone());
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Raw (uncoerced) value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Raw value as a string, if it is one.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Bind one argument; absent keys bind as `Null` with no raw text.
    #[must_use]
    pub fn bind(&self, key: &str) -> BoundArg {
        match self.values.get(key) {
            Some(raw) => BoundArg {
                value: coerce_value(raw),
                raw: raw.as_str().map(str::to_string),
            },
            None => BoundArg {
                value: Value::Null,
                raw: None,
            },
        }
    }

    /// Build a positional argument list in declaration order.
    #[must_use]
    pub fn bind_all(&self, names: &[String]) -> Vec<BoundArg> {
        names.iter().map(|name| self.bind(name)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// One argument bound for an action.
///
/// `raw` keeps the request string verbatim, since coercion is lossy for text:
/// `"1e3"` coerces to a number and `"null"` to `Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArg {
    pub value: Value,
    pub raw: Option<String>,
}

/// Coerce one raw argument value.
///
/// Strings that parse as a JSON literal become that literal; everything else is
/// passed through unchanged.
#[must_use]
pub fn coerce_value(raw: &Value) -> Value {
    match raw {
        Value::String(s) => coerce_str(s),
        other => other.clone(),
    }
}

/// Coerce a raw string: JSON literal if it parses, otherwise the string itself.
#[must_use]
pub fn coerce_str(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_coerce_str() {
        assert_eq!(coerce_str("42"), json!(42));
        assert_eq!(coerce_str("true"), json!(true));
        assert_eq!(coerce_str("null"), Value::Null);
        assert_eq!(coerce_str("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(coerce_str("[1,2]"), json!([1, 2]));
        assert_eq!(coerce_str("\"quoted\""), json!("quoted"));
        assert_eq!(coerce_str("hello"), json!("hello"));
        assert_eq!(coerce_str("{broken"), json!("{broken"));
        assert_eq!(coerce_str(""), json!(""));
    }

    #[test]
    fn test_non_string_values_pass_through() {
        assert_eq!(coerce_value(&json!(7)), json!(7));
        assert_eq!(coerce_value(&json!({"x": "1"})), json!({"x": "1"}));
    }

    #[test]
    fn test_merge_precedence() {
        let cookies = map(&[("st", "cookie-token"), ("a", "cookie")]);
        let query = map(&[("a", "query"), ("b", "query")]);
        let body = json!({"b": "body", "c": 3});
        let args = RequestArgs::merge(&cookies, &query, Some(&body));

        assert_eq!(args.get_str("st"), Some("cookie-token"));
        assert_eq!(args.get_str("a"), Some("query"));
        assert_eq!(args.get_str("b"), Some("body"));
        assert_eq!(args.get("c"), Some(&json!(3)));
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_non_object_body_ignored() {
        let args = RequestArgs::merge(&HashMap::new(), &HashMap::new(), Some(&json!([1, 2])));
        assert!(args.is_empty());
    }

    #[test]
    fn test_bind_all_in_declared_order() {
        let query = map(&[("newPassword", "n3w"), ("oldPassword", "0ld"), ("n", "5")]);
        let args = RequestArgs::merge(&HashMap::new(), &query, None);
        let names = vec![
            "oldPassword".to_string(),
            "newPassword".to_string(),
            "missing".to_string(),
            "n".to_string(),
        ];
        let bound = args.bind_all(&names);
        let values: Vec<Value> = bound.iter().map(|b| b.value.clone()).collect();
        assert_eq!(values, vec![json!("0ld"), json!("n3w"), Value::Null, json!(5)]);
        assert_eq!(bound[3].raw.as_deref(), Some("5"));
        assert_eq!(bound[2].raw, None);
    }

    #[test]
    fn test_bind_keeps_raw_text() {
        let query = map(&[("a", "1e3"), ("b", "null"), ("c", "\"bob\"")]);
        let body = json!({"d": 7});
        let args = RequestArgs::merge(&HashMap::new(), &query, Some(&body));

        let a = args.bind("a");
        assert_eq!(a.value, json!(1000.0));
        assert_eq!(a.raw.as_deref(), Some("1e3"));
        let b = args.bind("b");
        assert_eq!(b.value, Value::Null);
        assert_eq!(b.raw.as_deref(), Some("null"));
        assert_eq!(args.bind("c").raw.as_deref(), Some("\"bob\""));
        assert_eq!(args.bind("d").raw, None);
    }
}
