#![warn(missing_docs)]

//! Device I/O request queue with pluggable ordering strategies.
//!
//! Block device drivers park requests here while the hardware is busy and
//! pull them back in an order chosen by the queue's strategy. The crate ships
//! a first-come-first-served strategy and a read-priority strategy that keeps
//! writes sorted by disk position and interleaves bounded write bursts with
//! read bursts.

pub mod error;
pub mod fcfs;
pub mod order;
pub mod queue;
pub mod readprio;
pub mod registry;
pub mod request;
pub mod slot_list;
pub mod strategy;

pub use error::{BufqError, BufqResult};
pub use fcfs::FcfsStrategy;
pub use order::{before, QueueFlags, SortMode, EXACT, SORT_CYLINDER, SORT_MASK, SORT_RAWBLOCK};
pub use queue::{Queue, QueueConfig, QueueStats};
pub use readprio::ReadPrioStrategy;
pub use registry::{
    register_strategy, select_strategy, strategy_names, StrategyRegistry, ANY_STRATEGY,
    BUILTIN_STRATEGIES, DISK_DEFAULT_STRATEGY,
};
pub use request::{Direction, OrderingKey, Request, RequestId, RequestIdAllocator};
pub use slot_list::{SlotId, SlotList};
pub use strategy::{
    Strategy, StrategyDescriptor, StrategyInit, StrategyTuning, READ_BURST, WRITE_BURST,
};
