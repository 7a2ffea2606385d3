//! Request key generation.

use sha2::{Digest, Sha256};
use url::Url;

/// Compute the cache key for a request URL.
///
/// The fragment never reaches the server, so it is dropped; the query string
/// is kept verbatim. Host case is already folded by the URL parser.
pub fn compute_request_key(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> String {
        compute_request_key(&Url::parse(s).unwrap())
    }

    #[test]
    fn test_key_stability() {
        assert_eq!(key("https://shop.test/cart"), key("https://shop.test/cart"));
    }

    #[test]
    fn test_key_ignores_fragment_and_host_case() {
        assert_eq!(key("https://shop.test/cart"), key("https://SHOP.test/cart#summary"));
    }

    #[test]
    fn test_key_keeps_query() {
        assert_ne!(key("https://shop.test/api/products?page=1"), key("https://shop.test/api/products?page=2"));
    }

    #[test]
    fn test_key_format() {
        let hash = key("https://shop.test/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
