//! Clock and randomness capabilities
//!
//! Everything above this module runs on one logical thread of control, so a
//! deferred continuation is just a boxed closure handed to the [`Clock`].
//! Both capabilities are injectable so tests can supply deterministic fakes
//! (see `crate::testing`).

use std::rc::Rc;
use std::time::Duration;

/// A deferred continuation. Deliberately `!Send`: the core state it closes
/// over lives on the control thread.
pub type Task = Box<dyn FnOnce() + 'static>;

/// Schedules a task to run after a delay on the control thread.
pub trait Clock {
    fn after(&self, delay: Duration, task: Task);
}

/// Source of bounded random intervals and coin flips used by the animators.
pub trait RandomSource {
    /// A random duration in `[lower, upper)`.
    fn interval(&self, lower: Duration, upper: Duration) -> Duration;

    fn coin_flip(&self) -> bool;
}

impl Clock for Rc<dyn Clock> {
    fn after(&self, delay: Duration, task: Task) {
        (**self).after(delay, task);
    }
}

/// Production clock: a local task that sleeps and then runs the continuation.
///
/// Requires a `tokio::task::LocalSet` context, which `main` provides.
pub struct TokioClock;

impl Clock for TokioClock {
    fn after(&self, delay: Duration, task: Task) {
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

/// Production randomness backed by the thread-local RNG.
pub struct ThreadRngRandom;

impl RandomSource for ThreadRngRandom {
    fn interval(&self, lower: Duration, upper: Duration) -> Duration {
        use rand::Rng;
        debug_assert!(lower < upper);
        let millis = rand::thread_rng().gen_range(lower.as_millis()..upper.as_millis());
        #[allow(clippy::cast_possible_truncation)]
        Duration::from_millis(millis as u64)
    }

    fn coin_flip(&self) -> bool {
        use rand::Rng;
        rand::thread_rng().gen_bool(0.5)
    }
}
