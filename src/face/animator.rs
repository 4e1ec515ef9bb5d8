//! Animator capability and the shared hand-off choreography
//!
//! An animator is a self-contained multi-phase animation loop. `start` may
//! only be called once per instance; `stop` requests termination and the
//! supplied callback fires once the animator is really done. If a blocking
//! phase (an atomic sub-animation that must finish) is in flight, the
//! callback is latched and invoked from that phase's natural completion.
//! After the done callback fires the animator never mutates the surface
//! again.
//!
//! The four variants differ only in timing constants, poses, and frames; the
//! running/blocking/latch protocol lives here in [`AnimatorCore`].

use super::surface::FaceSurface;
use crate::sched::{Clock, RandomSource, Task};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Fired exactly once, when a stopped animator has fully quiesced.
pub type DoneCallback = Box<dyn FnOnce() + 'static>;

pub trait Animator {
    /// Begin the animation loop. Must not be called twice without an
    /// intervening completed stop.
    fn start(self: Rc<Self>);

    /// Request termination; `done` fires at the next safe boundary.
    fn stop(self: Rc<Self>, done: DoneCallback);
}

/// Shared state for every animator variant: the non-owning surface handle,
/// the scheduling capabilities, and the cooperative stop protocol.
pub(super) struct AnimatorCore {
    surface: Weak<FaceSurface>,
    clock: Rc<dyn Clock>,
    random: Rc<dyn RandomSource>,
    running: Cell<bool>,
    blocking: Cell<bool>,
    when_done: RefCell<Option<DoneCallback>>,
}

impl AnimatorCore {
    pub fn new(
        surface: &Rc<FaceSurface>,
        clock: Rc<dyn Clock>,
        random: Rc<dyn RandomSource>,
    ) -> Self {
        Self {
            surface: Rc::downgrade(surface),
            clock,
            random,
            running: Cell::new(false),
            blocking: Cell::new(false),
            when_done: RefCell::new(None),
        }
    }

    /// The surface, if it is still alive. A `None` here means the animator
    /// must treat itself as already stopped.
    pub fn surface(&self) -> Option<Rc<FaceSurface>> {
        self.surface.upgrade()
    }

    pub fn after(&self, delay: Duration, task: Task) {
        self.clock.after(delay, task);
    }

    pub fn random_delay(&self, lower: Duration, upper: Duration) -> Duration {
        self.random.interval(lower, upper)
    }

    pub fn coin_flip(&self) -> bool {
        self.random.coin_flip()
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn set_running(&self, value: bool) {
        self.running.set(value);
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking.get()
    }

    pub fn set_blocking(&self, value: bool) {
        self.blocking.set(value);
    }

    /// Latch `done` to be fired from the current blocking phase's completion.
    pub fn latch(&self, done: DoneCallback) {
        *self.when_done.borrow_mut() = Some(done);
    }

    /// Fire `done` immediately, discarding any stale latch.
    pub fn fire_now(&self, done: DoneCallback) {
        self.when_done.borrow_mut().take();
        done();
    }

    /// True once `stop` has latched a callback; loop phases check this at
    /// their natural boundaries.
    pub fn stop_requested(&self) -> bool {
        self.when_done.borrow().is_some()
    }

    /// Quiesce: clear the running flag and fire the latched callback, if any.
    pub fn finish(&self) {
        self.running.set(false);
        let done = self.when_done.borrow_mut().take();
        if let Some(done) = done {
            done();
        }
    }
}
