//! Arena-backed doubly-linked list.
//!
//! Elements live in a `Vec` of slots and link to each other by index, so a
//! [`SlotId`] stays valid across insertions and removals of other elements.
//! Vacated slots are recycled through a free list.

use crate::error::BufqResult;

/// Stable handle to an element of a [`SlotList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

#[derive(Debug)]
enum Slot<T> {
    Occupied {
        value: T,
        prev: Option<usize>,
        next: Option<usize>,
    },
    Vacant,
}

/// Doubly-linked list with index links.
#[derive(Debug)]
pub struct SlotList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for SlotList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlotList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Reserves room for `additional` more elements.
    pub fn try_reserve(&mut self, additional: usize) -> BufqResult<()> {
        self.slots.try_reserve(additional)?;
        self.free.try_reserve(additional)?;
        Ok(())
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the list holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// First element.
    #[inline]
    pub fn head(&self) -> Option<SlotId> {
        self.head.map(SlotId)
    }

    /// Last element.
    #[inline]
    pub fn tail(&self) -> Option<SlotId> {
        self.tail.map(SlotId)
    }

    /// Value at `id`, if occupied.
    pub fn get(&self, id: SlotId) -> Option<&T> {
        match self.slots.get(id.0) {
            Some(Slot::Occupied { value, .. }) => Some(value),
            _ => None,
        }
    }

    /// Element following `id`.
    pub fn next(&self, id: SlotId) -> Option<SlotId> {
        match self.slots.get(id.0) {
            Some(Slot::Occupied { next, .. }) => next.map(SlotId),
            _ => None,
        }
    }

    /// Element preceding `id`.
    pub fn prev(&self, id: SlotId) -> Option<SlotId> {
        match self.slots.get(id.0) {
            Some(Slot::Occupied { prev, .. }) => prev.map(SlotId),
            _ => None,
        }
    }

    fn alloc(&mut self, value: T, prev: Option<usize>, next: Option<usize>) -> usize {
        let slot = Slot::Occupied { value, prev, next };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    fn set_next(&mut self, idx: usize, to: Option<usize>) {
        if let Some(Slot::Occupied { next, .. }) = self.slots.get_mut(idx) {
            *next = to;
        }
    }

    fn set_prev(&mut self, idx: usize, to: Option<usize>) {
        if let Some(Slot::Occupied { prev, .. }) = self.slots.get_mut(idx) {
            *prev = to;
        }
    }

    /// Appends `value` at the tail.
    pub fn push_back(&mut self, value: T) -> SlotId {
        let old_tail = self.tail;
        let idx = self.alloc(value, old_tail, None);
        match old_tail {
            Some(t) => self.set_next(t, Some(idx)),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;
        SlotId(idx)
    }

    /// Inserts `value` immediately before `at`. Appends if `at` is not occupied.
    pub fn insert_before(&mut self, at: SlotId, value: T) -> SlotId {
        let prev = match self.slots.get(at.0) {
            Some(Slot::Occupied { prev, .. }) => *prev,
            _ => return self.push_back(value),
        };
        let idx = self.alloc(value, prev, Some(at.0));
        self.set_prev(at.0, Some(idx));
        match prev {
            Some(p) => self.set_next(p, Some(idx)),
            None => self.head = Some(idx),
        }
        self.len += 1;
        SlotId(idx)
    }

    /// Unlinks and returns the element at `id`.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        let slot = self.slots.get_mut(id.0)?;
        if matches!(slot, Slot::Vacant) {
            return None;
        }
        let (value, prev, next) = match std::mem::replace(slot, Slot::Vacant) {
            Slot::Occupied { value, prev, next } => (value, prev, next),
            Slot::Vacant => return None,
        };
        match prev {
            Some(p) => self.set_next(p, next),
            None => self.head = next,
        }
        match next {
            Some(n) => self.set_prev(n, prev),
            None => self.tail = prev,
        }
        self.free.push(id.0);
        self.len -= 1;
        Some(value)
    }

    /// First element satisfying `pred`, scanning from the head.
    pub fn find<F>(&self, mut pred: F) -> Option<SlotId>
    where
        F: FnMut(&T) -> bool,
    {
        let mut cur = self.head();
        while let Some(id) = cur {
            if self.get(id).is_some_and(&mut pred) {
                return Some(id);
            }
            cur = self.next(id);
        }
        None
    }

    /// Iterates values from head to tail.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cur: self.head(),
        }
    }

    /// Drops all elements and releases the backing storage.
    pub fn clear(&mut self) {
        self.slots = Vec::new();
        self.free = Vec::new();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }
}

/// Head-to-tail iterator over a [`SlotList`].
pub struct Iter<'a, T> {
    list: &'a SlotList<T>,
    cur: Option<SlotId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        self.cur = self.list.next(id);
        self.list.get(id)
    }
}
