// src/engine/capacity.rs

//! Concurrency slots.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::TaskId;

/// Fixed set of execution slots, keyed by task id.
#[derive(Debug, Clone)]
pub struct CapacitySlots {
    inner: Arc<SlotsInner>,
}

#[derive(Debug)]
struct SlotsInner {
    max: usize,
    active: Mutex<HashSet<TaskId>>,
}

impl CapacitySlots {
    pub fn new(max: usize) -> Self {
        Self {
            inner: Arc::new(SlotsInner {
                max,
                active: Mutex::new(HashSet::new()),
            }),
        }
    }

    fn active(&self) -> MutexGuard<'_, HashSet<TaskId>> {
        self.inner.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn max(&self) -> usize {
        self.inner.max
    }

    pub fn has_capacity(&self) -> bool {
        self.active().len() < self.inner.max
    }

    pub fn active_count(&self) -> usize {
        self.active().len()
    }

    pub fn is_reserved(&self, id: &str) -> bool {
        self.active().contains(id)
    }

    /// Reserve a slot for `id`.
    ///
    /// Fails when every slot is taken or `id` already holds one. The slot is
    /// released when the returned guard is dropped.
    pub fn try_reserve(&self, id: &str) -> Option<SlotGuard> {
        let mut active = self.active();
        if active.len() >= self.inner.max || active.contains(id) {
            return None;
        }
        active.insert(id.to_string());
        Some(SlotGuard {
            slots: self.clone(),
            id: id.to_string(),
        })
    }
}

/// A held slot.
#[derive(Debug)]
pub struct SlotGuard {
    slots: CapacitySlots,
    id: TaskId,
}

impl SlotGuard {
    pub fn task_id(&self) -> &str {
        &self.id
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots.active().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_until_full_then_release() {
        let slots = CapacitySlots::new(2);
        let a = slots.try_reserve("a").unwrap();
        let _b = slots.try_reserve("b").unwrap();
        assert!(!slots.has_capacity());
        assert!(slots.try_reserve("c").is_none());

        drop(a);
        assert!(slots.has_capacity());
        assert!(!slots.is_reserved("a"));
        assert!(slots.try_reserve("c").is_some());
    }

    #[test]
    fn same_id_cannot_hold_two_slots() {
        let slots = CapacitySlots::new(3);
        let _a = slots.try_reserve("a").unwrap();
        assert!(slots.try_reserve("a").is_none());
        assert_eq!(slots.active_count(), 1);
    }

    #[test]
    fn zero_slots_never_reserve() {
        let slots = CapacitySlots::new(0);
        assert!(!slots.has_capacity());
        assert!(slots.try_reserve("a").is_none());
    }
}
