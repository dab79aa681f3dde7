//! Named strategy table and selection rules.
//!
//! The process-wide registry starts out holding the built-in strategies and
//! may be extended with [`register_strategy`] during start-up. Private
//! [`StrategyRegistry`] values can be built for tests or embedded users.

use std::sync::OnceLock;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{BufqError, BufqResult};
use crate::fcfs::FcfsStrategy;
use crate::order::QueueFlags;
use crate::readprio::ReadPrioStrategy;
use crate::strategy::StrategyDescriptor;

/// Wildcard strategy name: pick the highest-priority strategy.
pub const ANY_STRATEGY: &str = "any";

/// Strategy name used for disks when the driver has no preference.
pub const DISK_DEFAULT_STRATEGY: &str = ANY_STRATEGY;

/// Strategies compiled into the crate.
pub static BUILTIN_STRATEGIES: &[StrategyDescriptor] = &[
    StrategyDescriptor {
        name: "fcfs",
        priority: 10,
        init: FcfsStrategy::init,
    },
    StrategyDescriptor {
        name: "readprio",
        priority: 30,
        init: ReadPrioStrategy::init,
    },
];

/// Table of available strategies.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<StrategyDescriptor>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding [`BUILTIN_STRATEGIES`].
    pub fn with_builtins() -> Self {
        Self {
            strategies: BUILTIN_STRATEGIES.to_vec(),
        }
    }

    /// Adds a strategy. Names must be unique.
    pub fn register(&mut self, desc: StrategyDescriptor) -> BufqResult<()> {
        if self.lookup(desc.name).is_some() {
            return Err(BufqError::DuplicateStrategy {
                name: desc.name.to_string(),
            });
        }
        debug!(
            "Registered strategy '{}' with priority {}",
            desc.name, desc.priority
        );
        self.strategies.push(desc);
        Ok(())
    }

    /// Number of registered strategies, placeholders included.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Finds a strategy by exact name.
    pub fn lookup(&self, name: &str) -> Option<&StrategyDescriptor> {
        self.strategies.iter().find(|d| d.name == name)
    }

    /// Highest-priority selectable strategy; the earliest registered wins a tie.
    pub fn best(&self) -> Option<&StrategyDescriptor> {
        self.strategies
            .iter()
            .filter(|d| d.is_selectable())
            .fold(None, |best: Option<&StrategyDescriptor>, d| match best {
                Some(b) if b.priority >= d.priority => Some(b),
                _ => Some(d),
            })
    }

    /// Registered names, highest priority first.
    pub fn names(&self) -> Vec<&'static str> {
        let mut sorted: Vec<&StrategyDescriptor> = self.strategies.iter().collect();
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
        sorted.into_iter().map(|d| d.name).collect()
    }

    /// Resolves the strategy a queue should be built with.
    ///
    /// `None` and [`ANY_STRATEGY`] pick the best strategy. A name that is
    /// not registered fails with `NoSuchStrategy` when the flags demand an
    /// exact match and otherwise falls back to the best strategy.
    pub fn select(
        &self,
        name: Option<&str>,
        flags: &QueueFlags,
    ) -> BufqResult<StrategyDescriptor> {
        let requested = match name {
            None | Some(ANY_STRATEGY) => None,
            Some(n) => Some(n),
        };

        if let Some(n) = requested {
            if let Some(desc) = self.lookup(n) {
                return Ok(*desc);
            }
            if flags.exact_strategy_required {
                return Err(BufqError::NoSuchStrategy {
                    name: n.to_string(),
                });
            }
        }

        let best = self.best().copied().ok_or(BufqError::NoStrategies)?;
        if let Some(n) = requested {
            warn!(
                "Strategy '{}' is not available, using '{}' instead",
                n, best.name
            );
        }
        Ok(best)
    }
}

fn global() -> &'static RwLock<StrategyRegistry> {
    static GLOBAL: OnceLock<RwLock<StrategyRegistry>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(StrategyRegistry::with_builtins()))
}

/// Adds a strategy to the process-wide registry.
pub fn register_strategy(desc: StrategyDescriptor) -> BufqResult<()> {
    global().write().register(desc)
}

/// Resolves a strategy against the process-wide registry.
pub fn select_strategy(name: Option<&str>, flags: &QueueFlags) -> BufqResult<StrategyDescriptor> {
    global().read().select(name, flags)
}

/// Names in the process-wide registry, highest priority first.
pub fn strategy_names() -> Vec<&'static str> {
    global().read().names()
}
