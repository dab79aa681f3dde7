//! First-come-first-served strategy: one FIFO, no reordering.

use std::collections::VecDeque;

use tracing::trace;

use crate::error::BufqResult;
use crate::order::QueueFlags;
use crate::request::{Request, RequestId};
use crate::strategy::{Strategy, StrategyTuning};

/// Dispatches requests strictly in arrival order, regardless of direction.
#[derive(Debug, Default)]
pub struct FcfsStrategy {
    queue: VecDeque<Request>,
}

impl FcfsStrategy {
    /// Creates an empty FIFO with `capacity` slots reserved.
    pub fn with_capacity(capacity: usize) -> BufqResult<Self> {
        let mut queue = VecDeque::new();
        queue.try_reserve(capacity)?;
        Ok(Self { queue })
    }

    /// Registry constructor.
    pub fn init(_flags: &QueueFlags, tuning: &StrategyTuning) -> BufqResult<Box<dyn Strategy>> {
        Ok(Box::new(Self::with_capacity(tuning.initial_capacity)?))
    }
}

impl Strategy for FcfsStrategy {
    fn put(&mut self, req: Request) {
        trace!("fcfs put: id={}", req.id);
        self.queue.push_back(req);
    }

    fn get(&mut self, remove: bool) -> Option<Request> {
        if remove {
            self.queue.pop_front()
        } else {
            self.queue.front().copied()
        }
    }

    fn cancel(&mut self, id: RequestId) -> Option<Request> {
        let pos = self.queue.iter().position(|r| r.id == id)?;
        self.queue.remove(pos)
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn fini(&mut self) {
        self.queue = VecDeque::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_across_directions() {
        let mut q = FcfsStrategy::default();
        q.put(Request::write(1, 90));
        q.put(Request::read(2, 10));
        q.put(Request::write(3, 50));

        assert_eq!(q.get(true).unwrap().id, RequestId(1));
        assert_eq!(q.get(true).unwrap().id, RequestId(2));
        assert_eq!(q.get(true).unwrap().id, RequestId(3));
        assert!(q.get(true).is_none());
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut q = FcfsStrategy::default();
        q.put(Request::read(1, 0));
        assert_eq!(q.get(false).unwrap().id, RequestId(1));
        assert_eq!(q.get(false).unwrap().id, RequestId(1));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_cancel_middle() {
        let mut q = FcfsStrategy::default();
        for id in 1..=3 {
            q.put(Request::read(id, id));
        }
        assert_eq!(q.cancel(RequestId(2)).unwrap().id, RequestId(2));
        assert!(q.cancel(RequestId(2)).is_none());
        assert_eq!(q.get(true).unwrap().id, RequestId(1));
        assert_eq!(q.get(true).unwrap().id, RequestId(3));
    }

    #[test]
    fn test_init_reserves_capacity() {
        let tuning = StrategyTuning {
            initial_capacity: 64,
            ..Default::default()
        };
        let q = FcfsStrategy::init(&QueueFlags::default(), &tuning).unwrap();
        assert!(q.is_empty());
    }
}
