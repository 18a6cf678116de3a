//! Set-membership hashes and synthetic resource IDs.

use sha2::{Digest, Sha256};

/// Stable hash of a string: the first eight bytes of its SHA-256 digest.
#[must_use]
pub fn hash_string(input: &str) -> u64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Fields of a catalog service that determine its set identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceKey<'a> {
    /// Instance ID.
    pub id: &'a str,
    /// Service name.
    pub name: &'a str,
    /// Service address.
    pub address: &'a str,
    /// Port.
    pub port: i64,
    /// Tags, in any order.
    pub tags: Vec<&'a str>,
}

/// Hash of a catalog service for set diffing. Tags are sorted first, so
/// their order does not matter; any other field change alters the hash.
#[must_use]
pub fn hash_service(service: &ServiceKey<'_>) -> u64 {
    let mut tags = service.tags.clone();
    tags.sort_unstable();

    let mut buf = format!(
        "{}-{}-{}-{}-",
        service.id, service.name, service.address, service.port
    );
    for tag in tags {
        buf.push_str(tag);
        buf.push('-');
    }
    hash_string(&buf)
}

/// ID of a catalog entry: `<node>-<address>-[<sorted,comma-joined ids>]`.
#[must_use]
pub fn catalog_entry_id(node: &str, address: &str, service_ids: &[String]) -> String {
    let mut ids: Vec<&str> = service_ids.iter().map(String::as_str).collect();
    ids.sort_unstable();
    format!("{node}-{address}-[{}]", ids.join(","))
}

/// ID of a catalog node: `<name>-<address>`.
#[must_use]
pub fn node_id(name: &str, address: &str) -> String {
    format!("{name}-{address}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web(tags: Vec<&'static str>) -> ServiceKey<'static> {
        ServiceKey {
            id: "web-1",
            name: "web",
            address: "10.0.0.5",
            port: 80,
            tags,
        }
    }

    #[test]
    fn tag_order_does_not_change_hash() {
        assert_eq!(
            hash_service(&web(vec!["a", "b", "c"])),
            hash_service(&web(vec!["c", "a", "b"]))
        );
    }

    #[test]
    fn every_field_changes_hash() {
        let base = hash_service(&web(vec!["a"]));
        let variants = [
            ServiceKey { id: "web-2", ..web(vec!["a"]) },
            ServiceKey { name: "api", ..web(vec!["a"]) },
            ServiceKey { address: "10.0.0.6", ..web(vec!["a"]) },
            ServiceKey { port: 81, ..web(vec!["a"]) },
            web(vec!["b"]),
            web(vec!["a", "b"]),
        ];
        for variant in &variants {
            assert_ne!(hash_service(variant), base, "{variant:?}");
        }
    }

    #[test]
    fn hash_string_is_deterministic() {
        assert_eq!(hash_string("consul"), hash_string("consul"));
        assert_ne!(hash_string("consul"), hash_string("Consul"));
    }

    #[test]
    fn catalog_entry_id_sorts_service_ids() {
        let ids = vec!["redis".to_string(), "api".to_string(), "web".to_string()];
        assert_eq!(
            catalog_entry_id("node-1", "10.0.0.1", &ids),
            "node-1-10.0.0.1-[api,redis,web]"
        );
        assert_eq!(catalog_entry_id("node-1", "10.0.0.1", &[]), "node-1-10.0.0.1-[]");
    }

    #[test]
    fn node_id_joins_name_and_address() {
        assert_eq!(node_id("foo", "127.0.0.1"), "foo-127.0.0.1");
    }
}
