//! Animator hand-off scheduling
//!
//! The director guarantees at most one animator is ever live on the surface.
//! Requests funnel through a single pending slot: a new request displaces the
//! one waiting there, notifying the displaced caller with `skipped = true`.
//! The active animator is always stopped before the next one starts, and the
//! next start rides the stopped animator's done callback.

use super::animator::{Animator, DoneCallback};
use super::annoyed::AnnoyedAnimator;
use super::confused::ConfusedAnimator;
use super::laughing::LaughingAnimator;
use super::neutral::NeutralAnimator;
use super::surface::FaceSurface;
use super::Emotion;
use crate::sched::{Clock, RandomSource};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

/// Invoked once per request: `skipped = true` when the request was displaced
/// from the pending slot, `false` when its animator actually started.
pub type StartedCallback = Box<dyn FnOnce(bool) + 'static>;

struct EmotionRequest {
    emotion: Emotion,
    animator: Rc<dyn Animator>,
    on_started: Option<StartedCallback>,
}

impl EmotionRequest {
    fn skip(self) {
        if let Some(on_started) = self.on_started {
            on_started(true);
        }
    }
}

pub struct FaceDirector {
    surface: Rc<FaceSurface>,
    clock: Rc<dyn Clock>,
    random: Rc<dyn RandomSource>,
    active: RefCell<Option<Rc<dyn Animator>>>,
    pending: RefCell<Option<EmotionRequest>>,
    current_emotion: Cell<Emotion>,
}

impl FaceDirector {
    pub fn new(
        surface: Rc<FaceSurface>,
        clock: Rc<dyn Clock>,
        random: Rc<dyn RandomSource>,
    ) -> Rc<Self> {
        Rc::new(Self {
            surface,
            clock,
            random,
            active: RefCell::new(None),
            pending: RefCell::new(None),
            current_emotion: Cell::new(Emotion::Neutral),
        })
    }

    pub fn surface(&self) -> &Rc<FaceSurface> {
        &self.surface
    }

    /// The emotion of the animator that most recently started.
    pub fn current_emotion(&self) -> Emotion {
        self.current_emotion.get()
    }

    /// Request a transition to `emotion`. The request parks in the pending
    /// slot until the active animator's stop completes; a newer request
    /// arriving first displaces it (`on_started(true)`).
    pub fn move_to_emotion(self: &Rc<Self>, emotion: Emotion, on_started: Option<StartedCallback>) {
        let displaced = self.pending.borrow_mut().take();
        if let Some(request) = displaced {
            debug!(from = ?request.emotion, to = ?emotion, "pending emotion displaced");
            request.skip();
        }

        let animator = self.make_animator(emotion);
        *self.pending.borrow_mut() = Some(EmotionRequest {
            emotion,
            animator,
            on_started,
        });

        // A second stop on the same active animator simply re-latches its
        // done callback; only the newest hand-off continuation survives.
        let active = self.active.borrow().clone();
        if let Some(active) = active {
            let this = Rc::clone(self);
            active.stop(Box::new(move || this.start_pending()));
        } else {
            self.start_pending();
        }
    }

    /// Stop the active animator and cancel anything pending. `completion`
    /// fires once the surface has quiesced.
    pub fn stop_all(&self, completion: Option<DoneCallback>) {
        let pending = self.pending.borrow_mut().take();
        if let Some(request) = pending {
            request.skip();
        }
        let active = self.active.borrow_mut().take();
        match (active, completion) {
            (Some(active), Some(done)) => active.stop(done),
            (Some(active), None) => active.stop(Box::new(|| {})),
            (None, Some(done)) => done(),
            (None, None) => {}
        }
    }

    fn start_pending(&self) {
        let Some(request) = self.pending.borrow_mut().take() else {
            return;
        };
        let EmotionRequest {
            emotion,
            animator,
            on_started,
        } = request;

        debug!(?emotion, "animator starting");
        *self.active.borrow_mut() = Some(Rc::clone(&animator));
        // The emotion is recorded before the callback runs so a callback
        // that immediately requests another transition observes it.
        self.current_emotion.set(emotion);
        animator.start();
        if let Some(on_started) = on_started {
            on_started(false);
        }
    }

    fn make_animator(&self, emotion: Emotion) -> Rc<dyn Animator> {
        let clock = Rc::clone(&self.clock);
        let random = Rc::clone(&self.random);
        match emotion {
            Emotion::Neutral => NeutralAnimator::new(&self.surface, clock, random),
            Emotion::Laughing => LaughingAnimator::new(&self.surface, clock, random),
            Emotion::Confused => ConfusedAnimator::new(&self.surface, clock, random),
            Emotion::Annoyed => AnnoyedAnimator::new(&self.surface, clock, random),
        }
    }
}
