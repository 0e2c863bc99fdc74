//! Small vs large transfer strategy.

use serde::{Deserialize, Serialize};

/// How a transfer reads and writes, chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One read, staged in memory, one replace call.
    Small,
    /// Paginated reads, spilled to disk, multi-part staged write.
    Large,
}

impl Strategy {
    /// `rows >= threshold` selects the large path.
    pub fn select(rows: u64, threshold: u64) -> Self {
        if rows >= threshold {
            Strategy::Large
        } else {
            Strategy::Small
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Small => write!(f, "small"),
            Strategy::Large => write!(f, "large"),
        }
    }
}
