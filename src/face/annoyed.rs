//! Annoyed face: a vertical squeeze with a delayed spring settle, then
//! occasional flat lateral head shakes. Mirrors the confused animator's
//! blocking structure with different shapes and timings.

use super::animator::{Animator, AnimatorCore, DoneCallback};
use super::surface::{FaceSurface, Frame, Pose};
use crate::sched::{Clock, RandomSource};
use std::rc::Rc;
use std::time::Duration;

const SQUEEZE: Duration = Duration::from_secs(1);
const SQUEEZE_SCALE_Y: f32 = 0.9;
const SETTLE_PAUSE: Duration = Duration::from_millis(500);
const RELEASE: Duration = Duration::from_secs(1);
const NOD_IDLE_MIN: Duration = Duration::from_secs(2);
const NOD_IDLE_MAX: Duration = Duration::from_secs(5);
const NOD_PHASE: Duration = Duration::from_millis(200);
const NOD_SHIFT_X: f32 = 6.0;

pub struct AnnoyedAnimator {
    core: AnimatorCore,
}

impl AnnoyedAnimator {
    pub fn new(
        surface: &Rc<FaceSurface>,
        clock: Rc<dyn Clock>,
        random: Rc<dyn RandomSource>,
    ) -> Rc<Self> {
        Rc::new(Self {
            core: AnimatorCore::new(surface, clock, random),
        })
    }

    fn wind_up(self: &Rc<Self>) {
        if !self.core.is_running() {
            self.core.finish();
            return;
        }
        let Some(surface) = self.core.surface() else {
            self.core.finish();
            return;
        };
        surface.set_pose(Pose::squeezed_y(SQUEEZE_SCALE_Y));

        let this = Rc::clone(self);
        self.core.after(
            SQUEEZE,
            Box::new(move || {
                let inner = Rc::clone(&this);
                this.core.after(
                    SETTLE_PAUSE,
                    Box::new(move || {
                        let Some(surface) = inner.core.surface() else {
                            inner.core.finish();
                            return;
                        };
                        surface.set_frame(Frame::Annoyed);
                        surface.set_pose(Pose::IDENTITY);
                        let innermost = Rc::clone(&inner);
                        inner.core.after(
                            RELEASE,
                            Box::new(move || {
                                innermost.core.set_blocking(false);
                                if innermost.core.stop_requested() {
                                    innermost.core.finish();
                                } else {
                                    innermost.plan_nod();
                                }
                            }),
                        );
                    }),
                );
            }),
        );
    }

    fn plan_nod(self: &Rc<Self>) {
        let delay = self.core.random_delay(NOD_IDLE_MIN, NOD_IDLE_MAX);
        let this = Rc::clone(self);
        self.core.after(
            delay,
            Box::new(move || {
                if !this.core.is_running() {
                    this.core.finish();
                    return;
                }
                let Some(surface) = this.core.surface() else {
                    this.core.finish();
                    return;
                };

                this.core.set_blocking(true);
                let shift = if this.core.coin_flip() {
                    NOD_SHIFT_X
                } else {
                    -NOD_SHIFT_X
                };
                surface.set_pose(Pose::shifted(shift, 0.0));

                let inner = Rc::clone(&this);
                this.core.after(
                    NOD_PHASE,
                    Box::new(move || {
                        let Some(surface) = inner.core.surface() else {
                            inner.core.set_blocking(false);
                            inner.core.finish();
                            return;
                        };
                        surface.set_pose(Pose::IDENTITY);
                        let innermost = Rc::clone(&inner);
                        inner.core.after(
                            NOD_PHASE,
                            Box::new(move || {
                                innermost.core.set_blocking(false);
                                if innermost.core.stop_requested() {
                                    innermost.core.finish();
                                } else {
                                    innermost.plan_nod();
                                }
                            }),
                        );
                    }),
                );
            }),
        );
    }
}

impl Animator for AnnoyedAnimator {
    fn start(self: Rc<Self>) {
        self.core.set_running(true);
        self.core.set_blocking(true);
        self.wind_up();
    }

    fn stop(self: Rc<Self>, done: DoneCallback) {
        self.core.set_running(false);
        if self.core.is_blocking() {
            self.core.latch(done);
        } else {
            self.core.fire_now(done);
        }
    }
}
