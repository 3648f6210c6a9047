//! Node keys: the identities external modules see.
//!
//! Keys come from three places. Markup `id` attributes and persisted
//! documents carry their own, and every node created without one gets a
//! minted `<type>_<n>` key. All of them share one interner, which is what
//! lets minting avoid every key the process has already seen.

use crate::model::NodeKind;
use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

static KEYS: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);
static MINTED: AtomicU64 = AtomicU64::new(0);

/// A node's key, e.g. `square` from markup or `anchor_12` when minted.
///
/// A 4-byte handle into the interner, so events naming a hit node compare
/// and hash without touching the string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey(Spur);

impl NodeKey {
    /// The key spelled `s`, as it appears in markup, events and documents.
    pub fn intern(s: &str) -> Self {
        NodeKey(KEYS.get_or_intern(s))
    }

    /// The key spelled `s` if anything has used it yet.
    pub fn get(s: &str) -> Option<Self> {
        KEYS.get(s).map(NodeKey)
    }

    pub fn as_str(&self) -> &str {
        KEYS.resolve(&self.0)
    }

    /// A new `<type>_<n>` key for a node of `kind`.
    ///
    /// Spellings already interned are skipped, so a minted key never matches
    /// one imported from markup or a loaded document.
    pub fn mint(kind: &NodeKind) -> Self {
        let prefix = kind.type_name();
        loop {
            let n = MINTED.fetch_add(1, Ordering::Relaxed);
            let candidate = format!("{prefix}_{n}");
            if KEYS.get(&candidate).is_none() {
                return Self::intern(&candidate);
            }
        }
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys persist as their spelling.
impl Serialize for NodeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeKey::intern(&s))
    }
}
