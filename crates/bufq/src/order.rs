//! Sort modes, queue flags and the disk-position comparator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BufqError, BufqResult};
use crate::request::{OrderingKey, Request};

/// Flag bit: sort by raw block number.
pub const SORT_RAWBLOCK: u32 = 0x0001;
/// Flag bit: sort by cylinder, then raw block number.
pub const SORT_CYLINDER: u32 = 0x0002;
/// Mask covering the sort-mode bits.
pub const SORT_MASK: u32 = 0x000f;
/// Flag bit: fail allocation instead of substituting another strategy.
pub const EXACT: u32 = 0x0010;

/// How requests are compared for disk position. Fixed per queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortMode {
    /// Compare raw block numbers only.
    #[default]
    RawBlock,
    /// Compare cylinders first, raw block numbers on a tie.
    CylinderBlock,
}

impl SortMode {
    /// True iff `a` is strictly ahead of `b` on the disk under this mode.
    #[inline]
    pub fn key_before(&self, a: &OrderingKey, b: &OrderingKey) -> bool {
        match self {
            SortMode::RawBlock => a.raw_block < b.raw_block,
            SortMode::CylinderBlock => {
                if a.cylinder != b.cylinder {
                    a.cylinder < b.cylinder
                } else {
                    a.raw_block < b.raw_block
                }
            }
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::RawBlock => write!(f, "rawblock"),
            SortMode::CylinderBlock => write!(f, "cylinder"),
        }
    }
}

/// Disk-order comparator over optional requests.
///
/// `None` stands for the end of the queue and sorts after every real
/// request: `before(x, None)` holds for any real `x`, `before(None, _)`
/// never does.
pub fn before(mode: SortMode, a: Option<&Request>, b: Option<&Request>) -> bool {
    match (a, b) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(a), Some(b)) => mode.key_before(&a.key, &b.key),
    }
}

/// Creation-time queue options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueFlags {
    /// Sort mode used by seek-ordering strategies.
    pub sort_mode: SortMode,
    /// Fail `alloc` rather than fall back to another strategy.
    pub exact_strategy_required: bool,
}

impl QueueFlags {
    /// Flags with the given sort mode and no exact-match requirement.
    pub fn new(sort_mode: SortMode) -> Self {
        Self {
            sort_mode,
            exact_strategy_required: false,
        }
    }

    /// Returns a copy requiring an exact strategy match.
    pub fn exact(mut self) -> Self {
        self.exact_strategy_required = true;
        self
    }

    /// Decodes a raw flag word. An empty sort field selects raw-block order.
    pub fn from_bits(bits: u32) -> BufqResult<Self> {
        if bits & !(SORT_MASK | EXACT) != 0 {
            return Err(BufqError::InvalidFlags { bits });
        }
        let sort_mode = match bits & SORT_MASK {
            0 | SORT_RAWBLOCK => SortMode::RawBlock,
            SORT_CYLINDER => SortMode::CylinderBlock,
            _ => return Err(BufqError::InvalidFlags { bits }),
        };
        Ok(Self {
            sort_mode,
            exact_strategy_required: bits & EXACT != 0,
        })
    }

    /// Encodes these flags as a raw flag word.
    pub fn to_bits(&self) -> u32 {
        let sort = match self.sort_mode {
            SortMode::RawBlock => SORT_RAWBLOCK,
            SortMode::CylinderBlock => SORT_CYLINDER,
        };
        if self.exact_strategy_required {
            sort | EXACT
        } else {
            sort
        }
    }
}
