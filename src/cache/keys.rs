//! Cache key definitions.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Resource family a cached response belongs to. Admin writes invalidate one
/// family without touching the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Events,
    Journals,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Events => "events",
            Family::Journals => "journals",
        }
    }
}

/// Key within a family.
///
/// List keys hash the full normalized parameter set; detail keys carry the
/// record id and its update timestamp, so a stale entry can never be served
/// for a record that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKey {
    List { params_hash: u64 },
    Detail { id: i64, updated_at_unix: i64 },
}

/// Compute a hash for any hashable value.
pub fn hash_value<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_keys_differ_per_revision() {
        let first = ResponseKey::Detail {
            id: 7,
            updated_at_unix: 100,
        };
        let second = ResponseKey::Detail {
            id: 7,
            updated_at_unix: 101,
        };
        assert_ne!(hash_value(&first), hash_value(&second));
    }

    #[test]
    fn hash_is_stable_for_equal_values() {
        let key = ResponseKey::List { params_hash: 42 };
        assert_eq!(hash_value(&key), hash_value(&key.clone()));
    }
}
