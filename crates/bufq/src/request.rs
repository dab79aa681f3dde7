//! Request handles as seen by the queue.
//!
//! A [`Request`] is a small caller-owned handle: an identity, a transfer
//! direction and the disk position used for ordering. Payload buffers stay
//! with the caller; the queue only moves handles between its orderings.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identity of a queued request, compared by value in `cancel`.
///
/// Values must be unique among the requests outstanding on one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out monotonically increasing request tickets.
#[derive(Debug, Default)]
pub struct RequestIdAllocator {
    next: AtomicU64,
}

impl RequestIdAllocator {
    /// Creates an allocator whose first ticket is `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Returns a fresh ticket.
    pub fn next_id(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Transfer direction of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Device to memory.
    Read,
    /// Memory to device.
    Write,
}

impl Direction {
    /// Returns true for reads.
    #[inline]
    pub fn is_read(&self) -> bool {
        matches!(self, Direction::Read)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => write!(f, "Read"),
            Direction::Write => write!(f, "Write"),
        }
    }
}

/// Disk position of a request.
///
/// Both fields are always carried; the queue's sort mode decides whether
/// `cylinder` takes part in comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OrderingKey {
    /// Cylinder number, meaningful for cylinder-sorted queues only.
    pub cylinder: u32,
    /// Raw logical block number on the device.
    pub raw_block: u64,
}

impl OrderingKey {
    /// Key for raw-block sorted queues.
    pub fn raw(raw_block: u64) -> Self {
        Self {
            cylinder: 0,
            raw_block,
        }
    }

    /// Key carrying a cylinder as well as a block number.
    pub fn cylinder(cylinder: u32, raw_block: u64) -> Self {
        Self {
            cylinder,
            raw_block,
        }
    }
}

impl fmt::Display for OrderingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cyl {} blk {}", self.cylinder, self.raw_block)
    }
}

/// A queued I/O request handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    /// Identity used by `cancel`.
    pub id: RequestId,
    /// Transfer direction.
    pub direction: Direction,
    /// Disk position.
    pub key: OrderingKey,
    /// Transfer length in bytes. Not used for ordering.
    pub len_bytes: u64,
}

impl Request {
    /// Creates a request handle.
    pub fn new(id: RequestId, direction: Direction, key: OrderingKey, len_bytes: u64) -> Self {
        Self {
            id,
            direction,
            key,
            len_bytes,
        }
    }

    /// Read of `raw_block` with no length.
    pub fn read(id: u64, raw_block: u64) -> Self {
        Self::new(RequestId(id), Direction::Read, OrderingKey::raw(raw_block), 0)
    }

    /// Write of `raw_block` with no length.
    pub fn write(id: u64, raw_block: u64) -> Self {
        Self::new(RequestId(id), Direction::Write, OrderingKey::raw(raw_block), 0)
    }

    /// Sets the transfer length.
    pub fn with_len(mut self, len_bytes: u64) -> Self {
        self.len_bytes = len_bytes;
        self
    }

    /// Sets the cylinder.
    pub fn on_cylinder(mut self, cylinder: u32) -> Self {
        self.key.cylinder = cylinder;
        self
    }
}
