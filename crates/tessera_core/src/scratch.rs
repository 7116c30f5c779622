//! Thread-Local Scratch Arena
//!
//! Picking runs once per primitive, many thousands of times per query. The
//! predicates need small working sets (a primitive's point list, a distance
//! table, a simplex tableau) whose size varies per call. Instead of allocating
//! fresh vectors on every invocation, each thread owns one [`Scratch`] arena
//! that is borrowed for the duration of a top-level query and released
//! (cleared, capacity retained) when the query returns.
//!
//! # Design
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  thread_local SCRATCH: RefCell<Scratch>       │
//! │                                              │
//! │  with_scratch(|s| { ... })                   │
//! │    ├─ borrow   (first caller on the thread)  │
//! │    ├─ run closure                            │
//! │    └─ release  (clear, keep capacity)        │
//! │                                              │
//! │  nested with_scratch → private temporary     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! A nested call (the arena is already borrowed further up the stack) gets a
//! fresh temporary arena instead of panicking, so predicates can freely call
//! each other.

use std::cell::RefCell;

use glam::DVec3;

/// Reusable working storage for geometry predicates.
#[derive(Debug, Default)]
pub struct Scratch {
    /// Primary point list (the primitive under test).
    pub points: Vec<DVec3>,
    /// Secondary point list (box faces, the other primitive).
    pub other_points: Vec<DVec3>,
    /// Flat scalar storage (distance tables, simplex tableaus).
    pub scalars: Vec<f64>,
    /// Integer bookkeeping (basis columns, strip cursors).
    pub indices: Vec<usize>,
    borrows: u64,
}

impl Scratch {
    /// Clears every buffer while keeping the allocations.
    pub fn release(&mut self) {
        self.points.clear();
        self.other_points.clear();
        self.scalars.clear();
        self.indices.clear();
    }

    /// Number of times this arena has been handed out.
    #[must_use]
    pub fn borrow_count(&self) -> u64 {
        self.borrows
    }

    /// Total retained capacity in elements, across all buffers.
    #[must_use]
    pub fn retained_capacity(&self) -> usize {
        self.points.capacity()
            + self.other_points.capacity()
            + self.scalars.capacity()
            + self.indices.capacity()
    }
}

thread_local! {
    static SCRATCH: RefCell<Scratch> = RefCell::new(Scratch::default());
}

/// Runs `f` with this thread's scratch arena and releases it afterwards.
pub fn with_scratch<R>(f: impl FnOnce(&mut Scratch) -> R) -> R {
    SCRATCH.with(|cell| {
        if let Ok(mut scratch) = cell.try_borrow_mut() {
            scratch.borrows = scratch.borrows.wrapping_add(1);
            scratch.release();
            let result = f(&mut scratch);
            scratch.release();
            result
        } else {
            log::trace!("scratch arena already borrowed, using a temporary");
            let mut temporary = Scratch::default();
            f(&mut temporary)
        }
    })
}

/// Reads the thread's arena statistics: `(borrow_count, retained_capacity)`.
///
/// Returns `None` while the arena is borrowed.
#[must_use]
pub fn scratch_stats() -> Option<(u64, usize)> {
    SCRATCH.with(|cell| {
        cell.try_borrow()
            .ok()
            .map(|s| (s.borrow_count(), s.retained_capacity()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_is_released_and_reused() {
        with_scratch(|s| {
            s.points.extend([DVec3::ZERO, DVec3::X, DVec3::Y]);
            s.scalars.resize(64, 1.0);
        });
        let (count_a, cap_a) = scratch_stats().unwrap();

        with_scratch(|s| {
            assert!(s.points.is_empty(), "points must be cleared on release");
            assert!(s.scalars.is_empty(), "scalars must be cleared on release");
        });
        let (count_b, cap_b) = scratch_stats().unwrap();

        assert_eq!(count_b, count_a + 1);
        assert!(cap_b >= cap_a, "capacity should be retained between borrows");
    }

    #[test]
    fn nested_borrow_uses_temporary() {
        let inner_len = with_scratch(|outer| {
            outer.points.push(DVec3::ONE);
            with_scratch(|inner| {
                inner.points.push(DVec3::ZERO);
                inner.points.push(DVec3::ZERO);
                inner.points.len()
            })
        });
        assert_eq!(inner_len, 2);
    }
}
