//! Deterministic fakes for testing
//!
//! These stand in for the production clock, randomness, and reply sink so
//! timing-dependent behavior can be driven step by step.

use crate::orchestrator::ReplySink;
use crate::sched::{Clock, RandomSource, Task};
use std::cell::{Cell, RefCell};
use std::time::Duration;

/// A manually advanced clock. Tasks fire in deadline order (FIFO for equal
/// deadlines) when [`TestClock::advance`] crosses them; a task may schedule
/// further tasks, which are honored within the same `advance` call.
pub struct TestClock {
    now_ms: Cell<u64>,
    next_seq: Cell<u64>,
    queue: RefCell<Vec<Entry>>,
}

struct Entry {
    fire_at_ms: u64,
    seq: u64,
    task: Task,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            now_ms: Cell::new(0),
            next_seq: Cell::new(0),
            queue: RefCell::new(Vec::new()),
        }
    }

    /// Current simulated time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    /// Number of tasks still scheduled.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Advance simulated time, running every task whose deadline is reached.
    pub fn advance(&self, by: Duration) {
        #[allow(clippy::cast_possible_truncation)]
        let target = self.now_ms.get() + by.as_millis() as u64;
        loop {
            let next = {
                let mut queue = self.queue.borrow_mut();
                let due = queue
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.fire_at_ms <= target)
                    .min_by_key(|(_, e)| (e.fire_at_ms, e.seq))
                    .map(|(i, _)| i);
                due.map(|i| queue.remove(i))
            };
            match next {
                Some(entry) => {
                    self.now_ms.set(entry.fire_at_ms);
                    (entry.task)();
                }
                None => break,
            }
        }
        self.now_ms.set(target);
    }
}

impl Clock for TestClock {
    fn after(&self, delay: Duration, task: Task) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        #[allow(clippy::cast_possible_truncation)]
        self.queue.borrow_mut().push(Entry {
            fire_at_ms: self.now_ms.get() + delay.as_millis() as u64,
            seq,
            task,
        });
    }
}

/// Randomness that always yields the lower interval bound and a fixed flip,
/// so scheduled phases land at predictable instants.
pub struct FixedRandom {
    flip: Cell<bool>,
}

impl FixedRandom {
    pub fn new() -> Self {
        Self {
            flip: Cell::new(true),
        }
    }

    pub fn set_flip(&self, value: bool) {
        self.flip.set(value);
    }
}

impl RandomSource for FixedRandom {
    fn interval(&self, lower: Duration, _upper: Duration) -> Duration {
        lower
    }

    fn coin_flip(&self) -> bool {
        self.flip.get()
    }
}

/// Reply sink that records every message it is asked to display.
pub struct RecordingSink {
    replies: RefCell<Vec<(String, bool)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            replies: RefCell::new(Vec::new()),
        }
    }

    pub fn all(&self) -> Vec<(String, bool)> {
        self.replies.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.replies.borrow().last().map(|(m, _)| m.clone())
    }

    pub fn contains(&self, message: &str) -> bool {
        self.replies.borrow().iter().any(|(m, _)| m == message)
    }
}

impl ReplySink for RecordingSink {
    fn reply(&self, message: &str, bounce: bool) {
        self.replies
            .borrow_mut()
            .push((message.to_string(), bounce));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn tasks_fire_in_deadline_then_fifo_order() {
        let clock = Rc::new(TestClock::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        for (label, ms) in [("b", 20), ("a", 10), ("c", 20)] {
            let log = Rc::clone(&log);
            clock.after(
                Duration::from_millis(ms),
                Box::new(move || log.borrow_mut().push(label)),
            );
        }

        clock.advance(Duration::from_millis(25));
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn tasks_scheduled_during_advance_still_fire() {
        let clock = Rc::new(TestClock::new());
        let fired = Rc::new(Cell::new(false));

        let inner_clock = Rc::clone(&clock);
        let inner_fired = Rc::clone(&fired);
        clock.after(
            Duration::from_millis(10),
            Box::new(move || {
                let fired = Rc::clone(&inner_fired);
                inner_clock.after(
                    Duration::from_millis(10),
                    Box::new(move || fired.set(true)),
                );
            }),
        );

        clock.advance(Duration::from_millis(30));
        assert!(fired.get());
    }
}
