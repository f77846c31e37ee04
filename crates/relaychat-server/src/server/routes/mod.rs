pub mod messages;
pub mod users;
pub mod websocket;

/// Query string as ordered key/value pairs.
///
/// Repeated keys are kept; lookups take the first occurrence.
pub type QueryPairs = Vec<(String, String)>;

/// First value supplied for `name`, if any.
pub fn first_param<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}
