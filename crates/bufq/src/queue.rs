//! Strategy-agnostic request queue.
//!
//! A [`Queue`] binds one strategy instance to the sort mode and options it
//! was created with. Drivers feed it with [`Queue::put`], pull work with
//! [`Queue::get`], withdraw requests with [`Queue::cancel`] and tear it down
//! with [`Queue::drain`] followed by [`Queue::free`].
//!
//! The queue is not internally synchronized; callers sharing one across
//! threads must serialize every call behind their own lock.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{BufqError, BufqResult};
use crate::order::{QueueFlags, SortMode};
use crate::registry::{self, StrategyRegistry};
use crate::request::{Request, RequestId};
use crate::strategy::{Strategy, StrategyDescriptor, StrategyTuning};

/// Serializable queue construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Strategy name; `None` or `"any"` picks the best registered one.
    pub strategy: Option<String>,
    /// Sort mode for seek-ordering strategies.
    pub sort_mode: SortMode,
    /// Fail instead of falling back when `strategy` is not registered.
    pub exact_strategy_required: bool,
    /// Strategy tuning.
    pub tuning: StrategyTuning,
}

impl QueueConfig {
    /// Parses a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> BufqResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Creation flags described by this config.
    pub fn flags(&self) -> QueueFlags {
        QueueFlags {
            sort_mode: self.sort_mode,
            exact_strategy_required: self.exact_strategy_required,
        }
    }
}

/// Counters kept by a queue over its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Requests accepted by `put`.
    pub puts: u64,
    /// Reads accepted by `put`.
    pub reads_put: u64,
    /// Writes accepted by `put`.
    pub writes_put: u64,
    /// Requests removed by `get`.
    pub dispatched: u64,
    /// Requests withdrawn by `cancel`.
    pub cancelled: u64,
    /// `cancel` calls that found nothing.
    pub cancel_misses: u64,
    /// Requests discarded by `drain`.
    pub drained: u64,
    /// Requests received from another queue by `move_all`.
    pub moved: u64,
}

/// A device request queue bound to one strategy.
pub struct Queue {
    name: &'static str,
    flags: QueueFlags,
    tuning: StrategyTuning,
    strategy: Box<dyn Strategy>,
    stats: QueueStats,
}

impl Queue {
    /// Allocates a queue from the process-wide registry with default tuning.
    pub fn alloc(strategy_name: Option<&str>, flags: QueueFlags) -> BufqResult<Self> {
        Self::alloc_with(strategy_name, flags, &StrategyTuning::default())
    }

    /// Allocates a queue from the process-wide registry.
    pub fn alloc_with(
        strategy_name: Option<&str>,
        flags: QueueFlags,
        tuning: &StrategyTuning,
    ) -> BufqResult<Self> {
        let desc = registry::select_strategy(strategy_name, &flags)?;
        Self::build(desc, flags, tuning)
    }

    /// Allocates a queue from an explicit registry.
    pub fn alloc_in(
        registry: &StrategyRegistry,
        strategy_name: Option<&str>,
        flags: QueueFlags,
        tuning: &StrategyTuning,
    ) -> BufqResult<Self> {
        let desc = registry.select(strategy_name, &flags)?;
        Self::build(desc, flags, tuning)
    }

    /// Allocates a queue described by `config` from the process-wide registry.
    pub fn from_config(config: &QueueConfig) -> BufqResult<Self> {
        Self::alloc_with(config.strategy.as_deref(), config.flags(), &config.tuning)
    }

    /// Wraps an already constructed strategy. The queue records default
    /// tuning, used if it later switches strategy.
    pub fn with_strategy(
        name: &'static str,
        flags: QueueFlags,
        strategy: Box<dyn Strategy>,
    ) -> Self {
        Self {
            name,
            flags,
            tuning: StrategyTuning::default(),
            strategy,
            stats: QueueStats::default(),
        }
    }

    fn build(
        desc: StrategyDescriptor,
        flags: QueueFlags,
        tuning: &StrategyTuning,
    ) -> BufqResult<Self> {
        let strategy = (desc.init)(&flags, tuning)?;
        info!(
            "Allocated queue: strategy='{}', sort={}, exact={}",
            desc.name, flags.sort_mode, flags.exact_strategy_required
        );
        Ok(Self {
            name: desc.name,
            flags,
            tuning: *tuning,
            strategy,
            stats: QueueStats::default(),
        })
    }

    /// Name of the bound strategy.
    #[inline]
    pub fn strategy_name(&self) -> &str {
        self.name
    }

    /// Creation flags.
    #[inline]
    pub fn flags(&self) -> QueueFlags {
        self.flags
    }

    /// Lifetime counters.
    #[inline]
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Number of queued requests.
    #[inline]
    pub fn len(&self) -> usize {
        self.strategy.len()
    }

    /// Returns true if nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strategy.is_empty()
    }

    /// Queues a request.
    pub fn put(&mut self, req: Request) {
        self.stats.puts += 1;
        if req.direction.is_read() {
            self.stats.reads_put += 1;
        } else {
            self.stats.writes_put += 1;
        }
        self.strategy.put(req);
    }

    /// Returns the next request, removing it when `remove` is set.
    pub fn get(&mut self, remove: bool) -> Option<Request> {
        let req = self.strategy.get(remove);
        if remove && req.is_some() {
            self.stats.dispatched += 1;
        }
        req
    }

    /// Returns the next request without removing it.
    ///
    /// Takes `&mut self` because the scheduling decision is made here and
    /// held until a removing `get` consumes it.
    pub fn peek(&mut self) -> Option<Request> {
        self.get(false)
    }

    /// Withdraws a queued request. `None` if it is not (or no longer) queued.
    pub fn cancel(&mut self, id: RequestId) -> Option<Request> {
        let removed = self.strategy.cancel(id);
        match removed {
            Some(_) => {
                self.stats.cancelled += 1;
                debug!("Cancelled request {} on '{}'", id, self.name);
            }
            None => {
                self.stats.cancel_misses += 1;
                debug!("Cancel of request {} on '{}' found nothing", id, self.name);
            }
        }
        removed
    }

    /// Removes every queued request, completing each through `done` with
    /// [`BufqError::Aborted`]. Returns how many were discarded.
    pub fn drain<F>(&mut self, mut done: F) -> usize
    where
        F: FnMut(Request, BufqError),
    {
        let mut count = 0;
        while let Some(req) = self.strategy.get(true) {
            count += 1;
            done(req, BufqError::Aborted { id: req.id });
        }
        self.stats.drained += count as u64;
        if count > 0 {
            warn!("Drained {} pending requests from '{}'", count, self.name);
        }
        count
    }

    /// Moves every queued request from `src` into `dst`. Returns the count.
    pub fn move_all(dst: &mut Queue, src: &mut Queue) -> usize {
        let mut count = 0;
        while let Some(req) = src.strategy.get(true) {
            dst.strategy.put(req);
            count += 1;
        }
        dst.stats.moved += count as u64;
        debug!(
            "Moved {} requests from '{}' to '{}'",
            count, src.name, dst.name
        );
        count
    }

    /// Releases the queue.
    ///
    /// # Panics
    ///
    /// Panics if any request is still queued.
    pub fn free(mut self) {
        assert!(
            self.peek().is_none(),
            "freeing non-empty queue '{}' ({} requests pending)",
            self.name,
            self.len()
        );
        self.strategy.fini();
        info!("Freed queue: strategy='{}'", self.name);
    }

    /// Rebuilds this queue on another strategy from the process-wide
    /// registry, carrying pending work over.
    ///
    /// The named strategy must exist. On failure the original queue is
    /// returned unchanged alongside the error. The new strategy is built
    /// with this queue's tuning, which is the default for queues made by
    /// [`Queue::with_strategy`].
    pub fn switch_strategy(self, name: &str) -> Result<Queue, (Queue, BufqError)> {
        let desc = registry::select_strategy(Some(name), &self.flags.exact());
        self.rebuild(desc)
    }

    /// Like [`Queue::switch_strategy`], resolving `name` in `registry`.
    pub fn switch_strategy_in(
        self,
        registry: &StrategyRegistry,
        name: &str,
    ) -> Result<Queue, (Queue, BufqError)> {
        let desc = registry.select(Some(name), &self.flags.exact());
        self.rebuild(desc)
    }

    fn rebuild(
        mut self,
        desc: BufqResult<StrategyDescriptor>,
    ) -> Result<Queue, (Queue, BufqError)> {
        let built = desc.and_then(|d| Self::build(d, self.flags, &self.tuning));
        let mut new = match built {
            Ok(q) => q,
            Err(e) => return Err((self, e)),
        };
        let moved = Self::move_all(&mut new, &mut self);
        info!(
            "Switched strategy '{}' -> '{}', {} requests carried over",
            self.name, new.name, moved
        );
        self.free();
        Ok(new)
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        let pending = self.strategy.len();
        if pending > 0 {
            warn!(
                "Queue '{}' dropped with {} requests pending",
                self.name, pending
            );
        }
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("strategy", &self.name)
            .field("flags", &self.flags)
            .field("len", &self.strategy.len())
            .field("stats", &self.stats)
            .finish()
    }
}
