//! Status tags carried by scene-graph nodes.
//!
//! Externally these are plain strings (they become CSS classes on rendered
//! elements and string lists in the persisted mirror).

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusTag {
    Selected,
    Pen,
    Frontier,
    Focus,
    Tip,
    ContainsTip,
}

impl StatusTag {
    pub const ALL: [StatusTag; 6] = [
        StatusTag::Selected,
        StatusTag::Pen,
        StatusTag::Frontier,
        StatusTag::Focus,
        StatusTag::Tip,
        StatusTag::ContainsTip,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusTag::Selected => "selected",
            StatusTag::Pen => "pen",
            StatusTag::Frontier => "frontier",
            StatusTag::Focus => "focus",
            StatusTag::Tip => "tip",
            StatusTag::ContainsTip => "containsTip",
        }
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusTag::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown status tag `{s}`"))
    }
}

/// A small ordered set of tags. Insertion keeps the set sorted, so the
/// serialized form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(SmallVec<[StatusTag; 4]>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tag: StatusTag) -> bool {
        self.0.binary_search(&tag).is_ok()
    }

    /// Returns `true` if the tag was newly added.
    pub fn insert(&mut self, tag: StatusTag) -> bool {
        match self.0.binary_search(&tag) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, tag);
                true
            }
        }
    }

    /// Returns `true` if the tag was present.
    pub fn remove(&mut self, tag: StatusTag) -> bool {
        match self.0.binary_search(&tag) {
            Ok(pos) => {
                self.0.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = StatusTag> + '_ {
        self.0.iter().copied()
    }

    /// Space-separated class list, e.g. `"selected frontier"`.
    pub fn to_class_list(&self) -> String {
        self.iter().map(StatusTag::as_str).collect::<Vec<_>>().join(" ")
    }
}

impl FromIterator<StatusTag> for TagSet {
    fn from_iter<I: IntoIterator<Item = StatusTag>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}
