//! URI parameters
//!
//! Values captured from pattern segments (`/users/:id`) and from the query string
//! (`?tab=posts&tag=rust&tag=async`), handed to route constructors by
//! [`RouteTable`](crate::RouteTable).

use std::collections::HashMap;
use std::str::FromStr;

/// Parameters captured from path segments
///
/// # Example
///
/// ```
/// use stack_navigator::RouteParams;
///
/// let mut params = RouteParams::new();
/// params.insert("id", "123");
///
/// assert_eq!(params.get("id"), Some("123"));
/// assert_eq!(params.get_as::<u32>("id"), Some(123));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Get a parameter and parse it
    ///
    /// Returns `None` if the parameter is missing or does not parse.
    pub fn get_as<T: FromStr>(&self, key: &str) -> Option<T> {
        self.params.get(key)?.parse().ok()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Query string parameters, in order of appearance
///
/// Keys may repeat.
///
/// # Example
///
/// ```
/// use stack_navigator::QueryParams;
///
/// let query = QueryParams::parse("page=1&tag=rust&tag=ui&q=hello%20world");
///
/// assert_eq!(query.get("page"), Some("1"));
/// assert_eq!(query.get_all("tag"), vec!["rust", "ui"]);
/// assert_eq!(query.get("q"), Some("hello world"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string, with or without the leading `?`
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (decode_component(key), decode_component(value)),
                None => (decode_component(pair), String::new()),
            })
            .collect();
        Self { pairs }
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in order
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn get_as<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key)?.parse().ok()
    }

    /// Append a value; existing values for `key` are kept
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Encode back to `a=1&b=2` form, without the leading `?`
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of pairs (repeated keys count once per value)
    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Percent-encode a URI component (RFC 3986 unreserved characters pass through)
pub fn encode_component(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

/// Decode a percent-encoded URI component; `+` decodes to a space.
///
/// Malformed escapes are kept verbatim; invalid UTF-8 is replaced.
pub fn decode_component(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match hex_pair(bytes[i + 1], bytes[i + 2]) {
                    Some(byte) => {
                        decoded.push(byte);
                        i += 3;
                    }
                    None => {
                        decoded.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_pair(high: u8, low: u8) -> Option<u8> {
    let digit = |c: u8| (c as char).to_digit(16);
    Some((digit(high)? * 16 + digit(low)?) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_params_get_as() {
        let mut params = RouteParams::new();
        params.insert("id", "123");
        params.insert("active", "true");

        assert_eq!(params.get_as::<i32>("id"), Some(123));
        assert_eq!(params.get_as::<bool>("active"), Some(true));
        assert_eq!(params.get_as::<i32>("active"), None);
        assert_eq!(params.get_as::<i32>("missing"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_route_params_from_map() {
        let mut map = HashMap::new();
        map.insert("name".to_string(), "Ada".to_string());
        let params = RouteParams::from_map(map);
        assert_eq!(params.get("name"), Some("Ada"));
        assert!(params.contains("name"));
        assert_eq!(params.iter().count(), 1);
    }

    #[test]
    fn test_query_params_basic() {
        let query = QueryParams::parse("?page=1&sort=name&flag");
        assert_eq!(query.get("page"), Some("1"));
        assert_eq!(query.get("sort"), Some("name"));
        assert_eq!(query.get("flag"), Some(""));
        assert_eq!(query.get("missing"), None);
        assert_eq!(query.get_as::<usize>("page"), Some(1));
    }

    #[test]
    fn test_query_params_multiple_values() {
        let query = QueryParams::parse("tag=rust&tag=async&tag=ui");
        assert_eq!(query.get_all("tag"), vec!["rust", "async", "ui"]);
        assert_eq!(query.get("tag"), Some("rust"));
        assert_eq!(query.len(), 3);
    }

    #[test]
    fn test_empty_query_string() {
        assert!(QueryParams::parse("").is_empty());
        assert!(QueryParams::parse("?").is_empty());
    }

    #[test]
    fn test_query_string_round_trip() {
        let mut query = QueryParams::new();
        query.insert("q", "hello world");
        query.insert("page", "2");
        assert_eq!(query.to_query_string(), "q=hello%20world&page=2");
        assert_eq!(QueryParams::parse(&query.to_query_string()), query);
    }

    #[test]
    fn test_component_encoding() {
        assert_eq!(encode_component("a b@c"), "a%20b%40c");
        assert_eq!(encode_component("café"), "caf%C3%A9");
    }

    #[test]
    fn test_component_decoding() {
        assert_eq!(decode_component("hello%20world"), "hello world");
        assert_eq!(decode_component("hello+world"), "hello world");
        assert_eq!(decode_component("caf%C3%A9"), "café");
        assert_eq!(decode_component("100%"), "100%");
        assert_eq!(decode_component("%zz"), "%zz");
    }
}
