//! Cache key construction.

use beagle_proto::QueryType;

/// Builds the cache key for a question: the lowercased name joined to the
/// numeric query type with a `:`.
///
/// DNS names compare case-insensitively, so `WWW.Example.COM` and
/// `www.example.com` must land in the same bucket.
pub fn make_key(qname: &str, qtype: QueryType) -> String {
    let mut key = String::with_capacity(qname.len() + 6);

    for c in qname.chars() {
        key.extend(c.to_lowercase());
    }

    key.push(':');
    key.push_str(&qtype.to_u16().to_string());
    key
}
