//! Neutral face: blinking eyes and a pleasant disposition, just a bit
//! fidgety. Two independent cycles run at once: a blink cycle and a nod
//! cycle. Only the nod is a blocking phase; stop during a nod waits for the
//! untilt to land.

use super::animator::{Animator, AnimatorCore, DoneCallback};
use super::surface::{FaceSurface, Frame, Pose};
use crate::sched::{Clock, RandomSource};
use std::rc::Rc;
use std::time::Duration;

const BLINK_IDLE_MIN: Duration = Duration::from_secs(1);
const BLINK_IDLE_MAX: Duration = Duration::from_secs(4);
const BLINK_HOLD_MIN: Duration = Duration::from_millis(50);
const BLINK_HOLD_MAX: Duration = Duration::from_millis(150);
const NOD_IDLE_MIN: Duration = Duration::from_secs(1);
const NOD_IDLE_MAX: Duration = Duration::from_secs(6);
const NOD_PHASE: Duration = Duration::from_millis(200);
const NOD_TILT: f32 = 0.1;

pub struct NeutralAnimator {
    core: AnimatorCore,
}

impl NeutralAnimator {
    pub fn new(
        surface: &Rc<FaceSurface>,
        clock: Rc<dyn Clock>,
        random: Rc<dyn RandomSource>,
    ) -> Rc<Self> {
        Rc::new(Self {
            core: AnimatorCore::new(surface, clock, random),
        })
    }

    fn plan_blink(self: &Rc<Self>) {
        let delay = self.core.random_delay(BLINK_IDLE_MIN, BLINK_IDLE_MAX);
        let this = Rc::clone(self);
        self.core.after(
            delay,
            Box::new(move || {
                if !this.core.is_running() {
                    return;
                }
                let Some(surface) = this.core.surface() else {
                    this.core.finish();
                    return;
                };
                surface.set_frame(Frame::NeutralBlink);
                this.plan_unblink();
            }),
        );
    }

    fn plan_unblink(self: &Rc<Self>) {
        let delay = self.core.random_delay(BLINK_HOLD_MIN, BLINK_HOLD_MAX);
        let this = Rc::clone(self);
        self.core.after(
            delay,
            Box::new(move || {
                if !this.core.is_running() {
                    return;
                }
                let Some(surface) = this.core.surface() else {
                    this.core.finish();
                    return;
                };
                surface.set_frame(Frame::NeutralOpen);
                this.plan_blink();
            }),
        );
    }

    fn plan_nod(self: &Rc<Self>) {
        let delay = self.core.random_delay(NOD_IDLE_MIN, NOD_IDLE_MAX);
        let this = Rc::clone(self);
        self.core.after(delay, Box::new(move || this.nod()));
    }

    fn nod(self: &Rc<Self>) {
        if !self.core.is_running() {
            return;
        }
        let Some(surface) = self.core.surface() else {
            self.core.finish();
            return;
        };

        self.core.set_blocking(true);
        let tilt = if self.core.coin_flip() {
            NOD_TILT
        } else {
            -NOD_TILT
        };
        surface.set_pose(Pose::tilted(tilt));

        let this = Rc::clone(self);
        self.core.after(
            NOD_PHASE,
            Box::new(move || {
                let Some(surface) = this.core.surface() else {
                    this.core.set_blocking(false);
                    this.core.finish();
                    return;
                };
                surface.set_pose(Pose::IDENTITY);
                let inner = Rc::clone(&this);
                this.core.after(
                    NOD_PHASE,
                    Box::new(move || {
                        inner.core.set_blocking(false);
                        if inner.core.stop_requested() {
                            inner.core.finish();
                        } else {
                            inner.plan_nod();
                        }
                    }),
                );
            }),
        );
    }
}

impl Animator for NeutralAnimator {
    fn start(self: Rc<Self>) {
        if let Some(surface) = self.core.surface() {
            surface.set_frame(Frame::NeutralOpen);
        }
        self.core.set_running(true);
        self.plan_blink();
        self.plan_nod();
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
