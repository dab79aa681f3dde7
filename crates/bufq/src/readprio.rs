//! Read-priority seek-sorting strategy.
//!
//! Reads are kept in arrival order and win by default. Writes are kept
//! sorted by disk position with a cursor marking the next one due, so
//! write dispatch sweeps across the disk. A burst counter hands writes a
//! bounded turn after every run of reads so neither direction starves.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::error::BufqResult;
use crate::order::{before, QueueFlags, SortMode};
use crate::request::{Request, RequestId};
use crate::slot_list::{SlotId, SlotList};
use crate::strategy::{Strategy, StrategyTuning};

/// Which queued request the last undelivered `get` settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selected {
    ReadHead,
    Write(SlotId),
}

/// Read-priority strategy state.
#[derive(Debug)]
pub struct ReadPrioStrategy {
    sort_mode: SortMode,
    read_burst: u32,
    write_burst: u32,
    reads: VecDeque<Request>,
    writes: SlotList<Request>,
    write_cursor: Option<SlotId>,
    sweep_at_start: bool,
    selected: Option<Selected>,
    read_burst_count: u32,
}

impl ReadPrioStrategy {
    /// Creates an empty strategy with default burst lengths.
    pub fn new(sort_mode: SortMode) -> Self {
        let tuning = StrategyTuning::default();
        Self {
            sort_mode,
            read_burst: tuning.read_burst,
            write_burst: tuning.write_burst,
            reads: VecDeque::new(),
            writes: SlotList::new(),
            write_cursor: None,
            sweep_at_start: true,
            selected: None,
            read_burst_count: 0,
        }
    }

    /// Creates an empty strategy with the given burst lengths and reserved capacity.
    pub fn with_tuning(sort_mode: SortMode, tuning: &StrategyTuning) -> BufqResult<Self> {
        tuning.validate()?;
        let mut strategy = Self::new(sort_mode);
        strategy.read_burst = tuning.read_burst;
        strategy.write_burst = tuning.write_burst;
        strategy.reads.try_reserve(tuning.initial_capacity)?;
        strategy.writes.try_reserve(tuning.initial_capacity)?;
        Ok(strategy)
    }

    /// Registry constructor.
    pub fn init(flags: &QueueFlags, tuning: &StrategyTuning) -> BufqResult<Box<dyn Strategy>> {
        Ok(Box::new(Self::with_tuning(flags.sort_mode, tuning)?))
    }

    /// Sort mode used for write ordering.
    #[inline]
    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    /// Number of queued reads.
    #[inline]
    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }

    /// Number of queued writes.
    #[inline]
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Current position in the read/write burst cycle.
    #[inline]
    pub fn read_burst_count(&self) -> u32 {
        self.read_burst_count
    }

    /// The write due next.
    pub fn write_cursor(&self) -> Option<&Request> {
        self.write_cursor.and_then(|id| self.writes.get(id))
    }

    /// Queued reads in dispatch order.
    pub fn read_order(&self) -> Vec<Request> {
        self.reads.iter().copied().collect()
    }

    /// Queued writes in disk order, head to tail.
    pub fn write_order(&self) -> Vec<Request> {
        self.writes.iter().copied().collect()
    }

    fn insert_write(&mut self, req: Request) {
        let Some(cursor) = self.write_cursor else {
            let id = self.writes.push_back(req);
            self.write_cursor = Some(id);
            self.sweep_at_start = true;
            return;
        };

        // Scan from the cursor; writes tend to land near it.
        let behind_cursor = before(self.sort_mode, Some(&req), self.writes.get(cursor));
        let mut cur = if behind_cursor {
            self.writes.head()
        } else {
            Some(cursor)
        };
        while let Some(id) = cur {
            if !before(self.sort_mode, self.writes.get(id), Some(&req)) {
                break;
            }
            cur = self.writes.next(id);
        }
        match cur {
            Some(id) => {
                self.writes.insert_before(id, req);
            }
            None => {
                self.writes.push_back(req);
            }
        }

        // Until the sweep dispatches its first write the cursor follows the
        // lowest pending write. A write already handed out by `get` pins it.
        if behind_cursor
            && self.sweep_at_start
            && !matches!(self.selected, Some(Selected::Write(_)))
        {
            self.write_cursor = self.writes.head();
        }
    }

    /// Unlinks a write, first moving the cursor off it (wrapping to the head).
    fn unlink_write(&mut self, id: SlotId, dispatched: bool) -> Option<Request> {
        let on_cursor = self.write_cursor == Some(id);
        let next = self.writes.next(id);
        let removed = self.writes.remove(id)?;
        if on_cursor {
            match next {
                Some(n) => {
                    self.write_cursor = Some(n);
                    if dispatched {
                        self.sweep_at_start = false;
                    }
                }
                None => {
                    self.write_cursor = self.writes.head();
                    self.sweep_at_start = true;
                }
            }
        }
        Some(removed)
    }

    fn select(&mut self) -> Option<Selected> {
        match (self.reads.is_empty(), self.writes.is_empty()) {
            (true, true) => {
                self.read_burst_count = 0;
                None
            }
            (true, false) => {
                self.read_burst_count = 0;
                self.write_cursor.map(Selected::Write)
            }
            (false, true) => {
                self.read_burst_count = 0;
                Some(Selected::ReadHead)
            }
            (false, false) => {
                if self.read_burst_count < self.read_burst {
                    self.read_burst_count += 1;
                    Some(Selected::ReadHead)
                } else if self.read_burst_count < self.read_burst + self.write_burst {
                    self.read_burst_count += 1;
                    self.write_cursor.map(Selected::Write)
                } else {
                    // This read opens the next cycle.
                    debug!(
                        "readprio burst cycle complete: reads={}, writes={}",
                        self.reads.len(),
                        self.writes.len()
                    );
                    self.read_burst_count = 1;
                    Some(Selected::ReadHead)
                }
            }
        }
    }

    /// Drops the cached selection. A write it pinned no longer holds the
    /// cursor away from the head of a sweep that has not started.
    fn release_selection(&mut self) {
        let was_write = matches!(self.selected, Some(Selected::Write(_)));
        self.selected = None;
        if was_write && self.sweep_at_start {
            self.write_cursor = self.writes.head();
        }
    }

    fn selected_request(&self, sel: Selected) -> Option<Request> {
        match sel {
            Selected::ReadHead => self.reads.front().copied(),
            Selected::Write(id) => self.writes.get(id).copied(),
        }
    }
}

impl Strategy for ReadPrioStrategy {
    fn put(&mut self, req: Request) {
        trace!(
            "readprio put: id={}, dir={}, key={}",
            req.id,
            req.direction,
            req.key
        );
        if req.direction.is_read() {
            self.reads.push_back(req);
        } else {
            self.insert_write(req);
        }
    }

    fn get(&mut self, remove: bool) -> Option<Request> {
        if self.selected.is_none() {
            self.selected = self.select();
        }
        let sel = self.selected?;
        let req = self.selected_request(sel);

        if remove {
            match sel {
                Selected::ReadHead => {
                    self.reads.pop_front();
                }
                Selected::Write(id) => {
                    self.unlink_write(id, true);
                }
            }
            self.selected = None;
            if let Some(r) = &req {
                trace!(
                    "readprio dispatch: id={}, dir={}, burst={}",
                    r.id,
                    r.direction,
                    self.read_burst_count
                );
            }
        }
        req
    }

    fn cancel(&mut self, id: RequestId) -> Option<Request> {
        if let Some(pos) = self.reads.iter().position(|r| r.id == id) {
            let removed = self.reads.remove(pos);
            self.release_selection();
            return removed;
        }
        let slot = self.writes.find(|r| r.id == id)?;
        let removed = self.unlink_write(slot, false);
        self.release_selection();
        removed
    }

    fn len(&self) -> usize {
        self.reads.len() + self.writes.len()
    }

    fn fini(&mut self) {
        self.reads = VecDeque::new();
        self.writes.clear();
        self.write_cursor = None;
        self.sweep_at_start = true;
        self.selected = None;
        self.read_burst_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(reqs: &[Request]) -> Vec<u64> {
        reqs.iter().map(|r| r.key.raw_block).collect()
    }

    fn small_bursts(read_burst: u32, write_burst: u32) -> ReadPrioStrategy {
        let tuning = StrategyTuning {
            read_burst,
            write_burst,
            initial_capacity: 0,
        };
        ReadPrioStrategy::with_tuning(SortMode::RawBlock, &tuning).unwrap()
    }

    #[test]
    fn test_empty_get_returns_none() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        assert!(s.get(false).is_none());
        assert!(s.get(true).is_none());
        assert!(s.write_cursor().is_none());
    }

    #[test]
    fn test_writes_sorted_on_insert() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 50));
        s.put(Request::write(2, 10));
        s.put(Request::write(3, 30));
        assert_eq!(keys(&s.write_order()), vec![10, 30, 50]);
    }

    #[test]
    fn test_first_write_sets_cursor() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 50));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(1));
    }

    #[test]
    fn test_cursor_follows_head_until_sweep_starts() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 50));
        s.put(Request::write(2, 10));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(2));
        s.put(Request::write(3, 30));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(2));

        // Sweep under way: a lower write now waits for the wrap.
        assert_eq!(s.get(true).unwrap().id, RequestId(2));
        s.put(Request::write(4, 5));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(3));
        assert_eq!(s.get(true).unwrap().id, RequestId(3));
        assert_eq!(s.get(true).unwrap().id, RequestId(1));
        assert_eq!(s.get(true).unwrap().id, RequestId(4));
    }

    #[test]
    fn test_selected_write_pins_cursor() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 50));
        assert_eq!(s.get(false).unwrap().id, RequestId(1));
        s.put(Request::write(2, 10));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(1));
    }

    #[test]
    fn test_insert_scans_from_cursor() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        for (id, key) in [(1, 10), (2, 20), (3, 30), (4, 40)] {
            s.put(Request::write(id, key));
        }
        // Dispatch 10 and 20, cursor now at 30.
        assert_eq!(s.get(true).unwrap().key.raw_block, 10);
        assert_eq!(s.get(true).unwrap().key.raw_block, 20);
        assert_eq!(s.write_cursor().unwrap().key.raw_block, 30);

        s.put(Request::write(5, 35));
        s.put(Request::write(6, 5));
        s.put(Request::write(7, 99));
        assert_eq!(keys(&s.write_order()), vec![5, 30, 35, 40, 99]);
        assert_eq!(s.write_cursor().unwrap().key.raw_block, 30);
    }

    #[test]
    fn test_equal_key_inserted_ahead_of_existing() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 10));
        s.put(Request::write(2, 20));
        s.put(Request::write(3, 20));
        let order: Vec<u64> = s.write_order().iter().map(|r| r.id.0).collect();
        assert_eq!(order, vec![1, 3, 2]);
    }

    #[test]
    fn test_cylinder_mode_ordering() {
        let mut s = ReadPrioStrategy::new(SortMode::CylinderBlock);
        s.put(Request::write(1, 5).on_cylinder(3));
        s.put(Request::write(2, 90).on_cylinder(1));
        s.put(Request::write(3, 1).on_cylinder(3));
        s.put(Request::write(4, 50).on_cylinder(2));
        let order: Vec<u64> = s.write_order().iter().map(|r| r.id.0).collect();
        assert_eq!(order, vec![2, 4, 3, 1]);
    }

    #[test]
    fn test_reads_are_fifo() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::read(1, 900));
        s.put(Request::read(2, 100));
        s.put(Request::read(3, 500));
        assert_eq!(s.get(true).unwrap().id, RequestId(1));
        assert_eq!(s.get(true).unwrap().id, RequestId(2));
        assert_eq!(s.get(true).unwrap().id, RequestId(3));
    }

    #[test]
    fn test_scenario_read_burst_then_writes() {
        let mut s = small_bursts(2, 1);
        s.put(Request::write(50, 50));
        s.put(Request::write(10, 10));
        s.put(Request::write(30, 30));
        s.put(Request::read(0xA, 0));
        s.put(Request::read(0xB, 0));

        let ids: Vec<u64> = (0..4).map(|_| s.get(true).unwrap().id.0).collect();
        assert_eq!(ids, vec![0xA, 0xB, 10, 30]);
        assert_eq!(s.get(true).unwrap().id.0, 50);
        assert!(s.get(true).is_none());
    }

    #[test]
    fn test_burst_cycle_interleaves() {
        let mut s = small_bursts(2, 1);
        for id in 0..6 {
            s.put(Request::read(id, 0));
        }
        for id in 100..103 {
            s.put(Request::write(id, id));
        }
        let dirs: Vec<bool> = (0..9)
            .map(|_| s.get(true).unwrap().direction.is_read())
            .collect();
        assert_eq!(
            dirs,
            vec![true, true, false, true, true, false, true, true, false]
        );
    }

    #[test]
    fn test_peek_is_idempotent_and_cached() {
        let mut s = small_bursts(1, 1);
        s.put(Request::read(1, 0));
        s.put(Request::write(2, 10));

        let first = s.get(false).unwrap();
        let second = s.get(false).unwrap();
        assert_eq!(first, second);
        assert_eq!(s.read_burst_count(), 1);
        assert_eq!(s.len(), 2);

        assert_eq!(s.get(true).unwrap(), first);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_put_after_peek_keeps_selection() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 50));
        assert_eq!(s.get(false).unwrap().id, RequestId(1));
        s.put(Request::write(2, 10));
        assert_eq!(s.get(true).unwrap().id, RequestId(1));
        assert_eq!(s.get(true).unwrap().id, RequestId(2));
    }

    #[test]
    fn test_cursor_wraps_to_head() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 40));
        s.put(Request::write(2, 50));
        assert_eq!(s.get(true).unwrap().id, RequestId(1));
        // Lands behind the cursor; reached after the sweep wraps.
        s.put(Request::write(3, 10));
        assert_eq!(s.get(true).unwrap().id, RequestId(2));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(3));
        assert_eq!(s.get(true).unwrap().id, RequestId(3));
        assert!(s.write_cursor().is_none());
    }

    #[test]
    fn test_cancel_releases_pinned_cursor() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 50));
        assert_eq!(s.get(false).unwrap().id, RequestId(1));
        s.put(Request::write(2, 10));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(1));

        s.put(Request::read(3, 0));
        assert_eq!(s.cancel(RequestId(3)).unwrap().id, RequestId(3));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(2));

        let order: Vec<u64> = std::iter::from_fn(|| s.get(true))
            .map(|r| r.key.raw_block)
            .collect();
        assert_eq!(order, vec![10, 50]);
    }

    #[test]
    fn test_cancel_read() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::read(1, 0));
        s.put(Request::read(2, 0));
        assert_eq!(s.get(false).unwrap().id, RequestId(1));
        assert_eq!(s.cancel(RequestId(1)).unwrap().id, RequestId(1));
        assert_eq!(s.get(true).unwrap().id, RequestId(2));
    }

    #[test]
    fn test_cancel_cursor_write_advances_cursor() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 10));
        s.put(Request::write(2, 20));
        s.put(Request::write(3, 30));
        assert_eq!(s.get(true).unwrap().id, RequestId(1));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(2));

        assert_eq!(s.cancel(RequestId(2)).unwrap().id, RequestId(2));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(3));

        assert_eq!(s.cancel(RequestId(3)).unwrap().id, RequestId(3));
        assert!(s.write_cursor().is_none());
        assert!(s.get(true).is_none());
    }

    #[test]
    fn test_cancel_tail_cursor_wraps() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 10));
        s.put(Request::write(2, 20));
        s.get(true);
        s.put(Request::write(3, 5));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(2));
        s.cancel(RequestId(2));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(3));
    }

    #[test]
    fn test_cancel_selected_write_invalidates_selection() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 10));
        s.put(Request::write(2, 20));
        assert_eq!(s.get(false).unwrap().id, RequestId(1));
        s.cancel(RequestId(1));
        assert_eq!(s.get(false).unwrap().id, RequestId(2));
    }

    #[test]
    fn test_cancel_non_cursor_write_keeps_cursor() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 10));
        s.put(Request::write(2, 20));
        s.put(Request::write(3, 30));
        s.cancel(RequestId(3));
        assert_eq!(s.write_cursor().unwrap().id, RequestId(1));
        assert_eq!(keys(&s.write_order()), vec![10, 20]);
    }

    #[test]
    fn test_cancel_unknown_is_none() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::read(1, 0));
        assert!(s.cancel(RequestId(42)).is_none());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_single_list_resets_burst() {
        let mut s = small_bursts(4, 2);
        s.put(Request::read(1, 0));
        s.put(Request::write(2, 0));
        s.get(true);
        assert_eq!(s.read_burst_count(), 1);
        s.get(true);
        assert_eq!(s.read_burst_count(), 0);
    }

    #[test]
    fn test_fini_clears_state() {
        let mut s = ReadPrioStrategy::new(SortMode::RawBlock);
        s.put(Request::write(1, 10));
        s.get(true);
        s.fini();
        assert!(s.is_empty());
        assert!(s.write_cursor().is_none());
    }

    #[test]
    fn test_init_rejects_bad_tuning() {
        let tuning = StrategyTuning {
            read_burst: 0,
            ..Default::default()
        };
        assert!(ReadPrioStrategy::init(&QueueFlags::default(), &tuning).is_err());
    }
}
