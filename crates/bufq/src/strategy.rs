//! The pluggable scheduling strategy contract.
//!
//! A [`Queue`](crate::queue::Queue) owns exactly one boxed [`Strategy`]
//! and forwards put/get/cancel to it. Strategies are registered through
//! [`StrategyDescriptor`]s, each carrying a name, a selection priority and
//! a constructor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BufqError, BufqResult};
use crate::order::QueueFlags;
use crate::request::{Request, RequestId};

/// Default number of reads dispatched before writes get a turn.
pub const READ_BURST: u32 = 48;
/// Default number of writes dispatched per burst once reads yield.
pub const WRITE_BURST: u32 = 16;

/// A request ordering algorithm.
///
/// Implementations are passive: no threads, no timers, no blocking.
pub trait Strategy: Send {
    /// Accepts a request. Never dispatches and never changes the pending selection.
    fn put(&mut self, req: Request);

    /// Returns the next request to dispatch.
    ///
    /// The decision is made once and cached until a call with `remove`
    /// set consumes it. With `remove` unset the request stays queued.
    fn get(&mut self, remove: bool) -> Option<Request>;

    /// Withdraws a still-queued request by identity. `None` if not queued.
    fn cancel(&mut self, id: RequestId) -> Option<Request>;

    /// Number of requests currently queued.
    fn len(&self) -> usize;

    /// Returns true if no request is queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases backing storage. Called once, on an empty strategy.
    fn fini(&mut self) {}
}

/// Tuning knobs passed to strategy constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyTuning {
    /// Reads dispatched per burst while writes are pending.
    pub read_burst: u32,
    /// Writes dispatched per burst once the read burst is spent.
    pub write_burst: u32,
    /// Request slots reserved up front.
    pub initial_capacity: usize,
}

impl Default for StrategyTuning {
    fn default() -> Self {
        Self {
            read_burst: READ_BURST,
            write_burst: WRITE_BURST,
            initial_capacity: 0,
        }
    }
}

impl StrategyTuning {
    /// Checks that the burst lengths can make progress.
    pub fn validate(&self) -> BufqResult<()> {
        if self.read_burst == 0 {
            return Err(BufqError::InvalidTuning {
                reason: "read_burst must be at least 1".to_string(),
            });
        }
        if self.write_burst == 0 {
            return Err(BufqError::InvalidTuning {
                reason: "write_burst must be at least 1".to_string(),
            });
        }
        if self.read_burst.checked_add(self.write_burst).is_none() {
            return Err(BufqError::InvalidTuning {
                reason: format!(
                    "read_burst {} + write_burst {} overflows",
                    self.read_burst, self.write_burst
                ),
            });
        }
        Ok(())
    }
}

/// Constructor signature for a registered strategy.
pub type StrategyInit = fn(&QueueFlags, &StrategyTuning) -> BufqResult<Box<dyn Strategy>>;

/// A named, prioritised strategy constructor.
#[derive(Clone, Copy)]
pub struct StrategyDescriptor {
    /// Name used for lookup.
    pub name: &'static str,
    /// Selection rank for wildcard and fallback allocation. Zero marks a
    /// placeholder that is only ever used when named exactly.
    pub priority: u32,
    /// Builds an empty instance.
    pub init: StrategyInit,
}

impl StrategyDescriptor {
    /// True if this entry may be picked without being named.
    #[inline]
    pub fn is_selectable(&self) -> bool {
        self.priority > 0
    }
}

impl fmt::Debug for StrategyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyDescriptor")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}
