//! Conversation state machine
//!
//! A finite-state model of one knock-knock joke round trip. Transitions are
//! guarded by a static legality table, every successful transition bumps a
//! monotonic generation counter, and an observer hook lets the orchestrator
//! react (including re-entering `transition` synchronously).
//!
//! Not thread safe by design: the whole conversation runs on one logical
//! control thread, and calling `transition` anywhere else is a programming
//! error, not a recoverable fault.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::thread::{self, ThreadId};

/// The expressive intent attached to a scripted response. Unlike
/// `face::Emotion`, there is no neutral case: a response always reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Laughing,
    Confused,
    Annoyed,
}

/// Conversation state. Exactly one is current at any time.
///
/// The `Processing*` states are transient: they exist so the transition
/// observer can synchronously decide the next real state. Reaching one and
/// stopping there means a line of input went unhandled, which is a defect in
/// the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationState {
    WaitingForKnock,
    ProcessingKnock { knock: String },
    WaitingForReply,
    WaitingForPunchline { who: String },
    ProcessingPunchline { who: String, punchline: String },
    Response { message: String, face: Face },
}

impl ConversationState {
    /// The legality table. Only these pairs may transition; note that a
    /// failed knock check may jump straight to a confused response, which is
    /// the only face allowed on the `ProcessingKnock -> Response` edge.
    pub fn can_follow(&self, next: &ConversationState) -> bool {
        use ConversationState as S;
        matches!(
            (self, next),
            (S::WaitingForKnock, S::ProcessingKnock { .. })
                | (S::ProcessingKnock { .. }, S::WaitingForReply)
                | (
                    S::ProcessingKnock { .. },
                    S::Response {
                        face: Face::Confused,
                        ..
                    }
                )
                | (S::WaitingForReply, S::WaitingForPunchline { .. })
                | (S::WaitingForPunchline { .. }, S::ProcessingPunchline { .. })
                | (S::ProcessingPunchline { .. }, S::Response { .. })
                | (S::Response { .. }, S::WaitingForKnock)
                | (S::Response { .. }, S::ProcessingKnock { .. })
        )
    }

    /// True for the transient states that must resolve synchronously inside
    /// the transition observer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConversationState::ProcessingKnock { .. }
                | ConversationState::ProcessingPunchline { .. }
        )
    }
}

/// Invoked with (old, new) after every successful transition. May call
/// `transition` again synchronously.
pub type TransitionObserver = Rc<dyn Fn(&ConversationState, &ConversationState)>;

pub struct Conversation {
    owner: ThreadId,
    state: RefCell<ConversationState>,
    generation: Cell<u64>,
    observer: RefCell<Option<TransitionObserver>>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            owner: thread::current().id(),
            state: RefCell::new(ConversationState::WaitingForKnock),
            generation: Cell::new(0),
            observer: RefCell::new(None),
        }
    }

    pub fn current_state(&self) -> ConversationState {
        self.state.borrow().clone()
    }

    /// Monotonic counter, incremented on every state replacement (even to an
    /// equal value). Deferred continuations capture it at schedule time and
    /// compare on fire; inequality means the conversation moved on.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub fn set_observer(&self, observer: TransitionObserver) {
        *self.observer.borrow_mut() = Some(observer);
    }

    /// Replace the current state.
    ///
    /// # Panics
    ///
    /// Panics when called off the owning thread or when `(current, next)` is
    /// not in the legality table. Both indicate a defect in the caller.
    pub fn transition(&self, next: ConversationState) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "conversation state may only change on its owning thread"
        );
        let old = {
            let mut state = self.state.borrow_mut();
            assert!(
                state.can_follow(&next),
                "illegal conversation transition: {:?} -> {next:?}",
                *state
            );
            std::mem::replace(&mut *state, next)
        };
        self.generation.set(self.generation.get() + 1);
        let new = self.state.borrow().clone();
        tracing::debug!(?old, ?new, generation = self.generation.get(), "transition");

        // Clone out of the cell so the observer can re-enter transition()
        // (and even replace the observer) without a RefCell conflict.
        let observer = self.observer.borrow().clone();
        if let Some(observer) = observer {
            observer(&old, &new);
        }
    }
}

/// Staleness check for deferred continuations.
///
/// Captures the generation at schedule time; [`GenerationGuard::run`] applies
/// the effect only if the live generation still matches. Generation strictly
/// increases, so equality means no intervening transition, which subsumes
/// both "moved on" and "moved on and back".
pub struct GenerationGuard {
    conversation: Weak<Conversation>,
    generation: u64,
}

impl GenerationGuard {
    pub fn capture(conversation: &Rc<Conversation>) -> Self {
        Self {
            conversation: Rc::downgrade(conversation),
            generation: conversation.generation(),
        }
    }

    pub fn is_current(&self) -> bool {
        self.conversation
            .upgrade()
            .is_some_and(|c| c.generation() == self.generation)
    }

    /// Run `effect` unless the conversation has advanced (or been dropped).
    pub fn run(&self, effect: impl FnOnce()) {
        if self.is_current() {
            effect();
        } else {
            tracing::trace!(captured = self.generation, "stale continuation dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn processing_knock() -> ConversationState {
        ConversationState::ProcessingKnock {
            knock: "knock knock".into(),
        }
    }

    fn response(face: Face) -> ConversationState {
        ConversationState::Response {
            message: "ha".into(),
            face,
        }
    }

    /// One representative value per legality-relevant shape.
    fn representatives() -> Vec<ConversationState> {
        vec![
            ConversationState::WaitingForKnock,
            processing_knock(),
            ConversationState::WaitingForReply,
            ConversationState::WaitingForPunchline { who: "boo".into() },
            ConversationState::ProcessingPunchline {
                who: "boo".into(),
                punchline: "cry".into(),
            },
            response(Face::Laughing),
            response(Face::Confused),
            response(Face::Annoyed),
        ]
    }

    /// Exhaustive check of every ordered pair of representative states
    /// against the documented table, self-loops and reverse edges included.
    #[test]
    fn legality_table_is_exact() {
        use ConversationState as S;
        let states = representatives();
        for from in &states {
            for to in &states {
                let expected = match (from, to) {
                    (S::WaitingForKnock | S::Response { .. }, S::ProcessingKnock { .. })
                    | (S::ProcessingKnock { .. }, S::WaitingForReply)
                    | (
                        S::ProcessingKnock { .. },
                        S::Response {
                            face: Face::Confused,
                            ..
                        },
                    )
                    | (S::WaitingForReply, S::WaitingForPunchline { .. })
                    | (S::WaitingForPunchline { .. }, S::ProcessingPunchline { .. })
                    | (S::ProcessingPunchline { .. }, S::Response { .. })
                    | (S::Response { .. }, S::WaitingForKnock) => true,
                    _ => false,
                };
                assert_eq!(
                    from.can_follow(to),
                    expected,
                    "pair {from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn generation_increments_by_one_per_transition() {
        let conversation = Conversation::new();
        assert_eq!(conversation.generation(), 0);

        conversation.transition(processing_knock());
        assert_eq!(conversation.generation(), 1);
        conversation.transition(ConversationState::WaitingForReply);
        assert_eq!(conversation.generation(), 2);
        conversation.transition(ConversationState::WaitingForPunchline { who: "boo".into() });
        assert_eq!(conversation.generation(), 3);
    }

    #[test]
    fn generation_bumps_even_when_value_repeats() {
        let conversation = Conversation::new();
        // Cycle through a response twice with identical processing payloads.
        conversation.transition(processing_knock());
        conversation.transition(response(Face::Confused));
        assert_eq!(conversation.generation(), 2);
        conversation.transition(processing_knock());
        conversation.transition(response(Face::Confused));
        assert_eq!(conversation.generation(), 4);
    }

    #[test]
    #[should_panic(expected = "illegal conversation transition")]
    fn illegal_transition_is_fatal() {
        let conversation = Conversation::new();
        conversation.transition(ConversationState::WaitingForReply);
    }

    #[test]
    #[should_panic(expected = "illegal conversation transition")]
    fn self_loop_is_fatal() {
        let conversation = Conversation::new();
        conversation.transition(ConversationState::WaitingForKnock);
    }

    #[test]
    #[should_panic(expected = "illegal conversation transition")]
    fn non_confused_response_from_knock_is_fatal() {
        let conversation = Conversation::new();
        conversation.transition(processing_knock());
        conversation.transition(response(Face::Laughing));
    }

    #[test]
    fn observer_sees_old_and_new() {
        let conversation = Rc::new(Conversation::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        conversation.set_observer(Rc::new(move |old, new| {
            log.borrow_mut().push((old.clone(), new.clone()));
        }));

        conversation.transition(processing_knock());
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, ConversationState::WaitingForKnock);
        assert_eq!(seen[0].1, processing_knock());
    }

    /// The observer may transition again while the outer transition is still
    /// on the stack; this is how `Processing*` states resolve.
    #[test]
    fn observer_may_reenter_transition() {
        let conversation = Rc::new(Conversation::new());
        let inner = Rc::downgrade(&conversation);
        conversation.set_observer(Rc::new(move |_, new| {
            if matches!(new, ConversationState::ProcessingKnock { .. }) {
                inner
                    .upgrade()
                    .unwrap()
                    .transition(ConversationState::WaitingForReply);
            }
        }));

        conversation.transition(processing_knock());
        assert_eq!(
            conversation.current_state(),
            ConversationState::WaitingForReply
        );
        assert_eq!(conversation.generation(), 2);
    }

    #[test]
    fn stale_guard_is_a_no_op() {
        let conversation = Rc::new(Conversation::new());
        let guard = GenerationGuard::capture(&conversation);

        // Simulate the race: the conversation advances between schedule and
        // fire.
        conversation.transition(processing_knock());

        let fired = Cell::new(false);
        guard.run(|| fired.set(true));
        assert!(!fired.get());
    }

    #[test]
    fn current_guard_runs() {
        let conversation = Rc::new(Conversation::new());
        let guard = GenerationGuard::capture(&conversation);
        let fired = Cell::new(false);
        guard.run(|| fired.set(true));
        assert!(fired.get());
    }

    #[test]
    fn guard_on_dropped_conversation_is_a_no_op() {
        let conversation = Rc::new(Conversation::new());
        let guard = GenerationGuard::capture(&conversation);
        drop(conversation);
        let fired = Cell::new(false);
        guard.run(|| fired.set(true));
        assert!(!fired.get());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_face() -> impl Strategy<Value = Face> {
            prop_oneof![
                Just(Face::Laughing),
                Just(Face::Confused),
                Just(Face::Annoyed),
            ]
        }

        fn arb_state() -> impl Strategy<Value = ConversationState> {
            prop_oneof![
                Just(ConversationState::WaitingForKnock),
                "[a-z ]{0,12}".prop_map(|knock| ConversationState::ProcessingKnock { knock }),
                Just(ConversationState::WaitingForReply),
                "[a-z ]{0,12}".prop_map(|who| ConversationState::WaitingForPunchline { who }),
                ("[a-z ]{0,12}", "[a-z ]{0,12}").prop_map(|(who, punchline)| {
                    ConversationState::ProcessingPunchline { who, punchline }
                }),
                ("[a-z ]{0,12}", arb_face())
                    .prop_map(|(message, face)| ConversationState::Response { message, face }),
            ]
        }

        /// Index into the variant vocabulary, ignoring payloads.
        fn tag(state: &ConversationState) -> usize {
            match state {
                ConversationState::WaitingForKnock => 0,
                ConversationState::ProcessingKnock { .. } => 1,
                ConversationState::WaitingForReply => 2,
                ConversationState::WaitingForPunchline { .. } => 3,
                ConversationState::ProcessingPunchline { .. } => 4,
                ConversationState::Response { .. } => 5,
            }
        }

        proptest! {
            /// Legality depends only on the variant pair, except the
            /// Confused-only restriction on the knock -> response edge.
            #[test]
            fn legality_ignores_payloads(from in arb_state(), to in arb_state()) {
                let expected = match (tag(&from), tag(&to)) {
                    (0 | 5, 1) | (1, 2) | (2, 3) | (3, 4) | (4, 5) | (5, 0) => true,
                    (1, 5) => matches!(
                        to,
                        ConversationState::Response { face: Face::Confused, .. }
                    ),
                    _ => false,
                };
                prop_assert_eq!(from.can_follow(&to), expected);
            }

            /// A random legal walk always bumps generation by exactly one
            /// per step.
            #[test]
            fn generation_is_strictly_monotonic(steps in proptest::collection::vec(arb_state(), 1..40)) {
                let conversation = Conversation::new();
                let mut expected = 0u64;
                for next in steps {
                    if conversation.current_state().can_follow(&next) {
                        conversation.transition(next);
                        expected += 1;
                    }
                    prop_assert_eq!(conversation.generation(), expected);
                }
            }
        }
    }
}
