//! Laughing face: slow realization that something is funny, then
//! uncontrollable giggling until told to stop. The intro (pause, rise,
//! settle) is fixed; the giggle loop checks for a latched stop at each
//! boundary; quiescing always goes through a fixed settle-back phase.

use super::animator::{Animator, AnimatorCore, DoneCallback};
use super::surface::{FaceSurface, Frame, Pose};
use crate::sched::{Clock, RandomSource};
use std::rc::Rc;
use std::time::Duration;

const INTRO_PAUSE: Duration = Duration::from_millis(800);
const RISE: Duration = Duration::from_secs(1);
const RISE_OFFSET_Y: f32 = -40.0;
const SETTLE: Duration = Duration::from_millis(500);
const SETTLE_OFFSET_Y: f32 = 3.0;
const GIGGLE_PHASE: Duration = Duration::from_millis(100);
const GIGGLE_TILT: f32 = 0.1;
const GIGGLE_SQUEEZE_Y: f32 = 0.95;
const SETTLE_BACK: Duration = Duration::from_millis(300);

pub struct LaughingAnimator {
    core: AnimatorCore,
}

impl LaughingAnimator {
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
        let Some(surface) = self.core.surface() else {
            self.settle_back();
            return;
        };
        surface.set_frame(Frame::LaughRise);

        let this = Rc::clone(self);
        self.core.after(
            INTRO_PAUSE,
            Box::new(move || {
                let Some(surface) = this.core.surface() else {
                    this.settle_back();
                    return;
                };
                surface.set_pose(Pose::shifted(0.0, RISE_OFFSET_Y));
                let inner = Rc::clone(&this);
                this.core.after(
                    RISE,
                    Box::new(move || {
                        let Some(surface) = inner.core.surface() else {
                            inner.settle_back();
                            return;
                        };
                        surface.set_pose(Pose::shifted(0.0, SETTLE_OFFSET_Y));
                        let innermost = Rc::clone(&inner);
                        inner
                            .core
                            .after(SETTLE, Box::new(move || innermost.giggle()));
                    }),
                );
            }),
        );
    }

    /// Two short alternating tilts, repeated until a stop is latched.
    fn giggle(self: &Rc<Self>) {
        if !self.core.is_running() {
            self.settle_back();
            return;
        }
        let Some(surface) = self.core.surface() else {
            self.settle_back();
            return;
        };
        surface.set_frame(Frame::LaughTears);
        surface.set_pose(Pose::squeezed_y(GIGGLE_SQUEEZE_Y).with_tilt(GIGGLE_TILT));

        let this = Rc::clone(self);
        self.core.after(
            GIGGLE_PHASE,
            Box::new(move || {
                if let Some(surface) = this.core.surface() {
                    surface.set_pose(Pose::tilted(-GIGGLE_TILT));
                }
                let inner = Rc::clone(&this);
                this.core.after(
                    GIGGLE_PHASE,
                    Box::new(move || {
                        if inner.core.stop_requested() {
                            inner.settle_back();
                        } else {
                            inner.giggle();
                        }
                    }),
                );
            }),
        );
    }

    /// Fixed settle-back to the identity pose; the done callback fires only
    /// after it lands.
    fn settle_back(self: &Rc<Self>) {
        if let Some(surface) = self.core.surface() {
            surface.set_pose(Pose::IDENTITY);
        }
        let this = Rc::clone(self);
        self.core
            .after(SETTLE_BACK, Box::new(move || this.core.finish()));
    }
}

impl Animator for LaughingAnimator {
    fn start(self: Rc<Self>) {
        self.core.set_running(true);
        self.wind_up();
    }

    /// The whole laugh counts as blocking: a stop latches whenever the loop
    /// is live and resolves at the next giggle boundary.
    fn stop(self: Rc<Self>, done: DoneCallback) {
        if self.core.is_running() {
            self.core.latch(done);
        } else {
            self.core.fire_now(done);
        }
    }
}
