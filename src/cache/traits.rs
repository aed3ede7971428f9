//! Core traits and types for the caching system.

use std::fmt::Debug;
use std::hash::Hash;

/// Identity of a cacheable read.
///
/// Keys are immutable values: two keys are equal iff their resource kind and
/// every parameter are equal. Changing a parameter means building a new key.
pub trait QueryKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {
  /// Resource family of a key, used for prefix invalidation.
  type Kind: Copy + Eq + Debug + Send + Sync + 'static;

  /// Resource family this key belongs to (e.g. "task lists")
  fn kind(&self) -> Self::Kind;

  /// Human readable description, used in logs and error messages
  fn description(&self) -> String;
}

/// Selects a set of cached keys for invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern<K: QueryKey> {
  /// Exactly this key
  Exact(K),
  /// Every key of a resource kind, whatever its parameters
  Kind(K::Kind),
}

impl<K: QueryKey> KeyPattern<K> {
  pub fn matches(&self, key: &K) -> bool {
    match self {
      KeyPattern::Exact(k) => k == key,
      KeyPattern::Kind(kind) => key.kind() == *kind,
    }
  }
}

#[cfg(test)]
pub(crate) mod test_keys {
  use super::QueryKey;

  /// Minimal key type for exercising the generic cache machinery.
  #[derive(Debug, Clone, PartialEq, Eq, Hash)]
  pub enum TestKey {
    List(&'static str),
    Item(u32),
  }

  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub enum TestKind {
    List,
    Item,
  }

  impl QueryKey for TestKey {
    type Kind = TestKind;

    fn kind(&self) -> TestKind {
      match self {
        TestKey::List(_) => TestKind::List,
        TestKey::Item(_) => TestKind::Item,
      }
    }

    fn description(&self) -> String {
      format!("{:?}", self)
    }
  }
}
