//! Conversation orchestration
//!
//! Glue between the conversation state machine, the face director, and the
//! peer boundary. The transition observer runs here: transient states are
//! resolved synchronously (re-entering `transition`), responses kick off the
//! reaction choreography, and every deferred step is generation guarded so a
//! conversation that has moved on silently drops stale continuations.

use crate::conversation::{Conversation, ConversationState, Face, GenerationGuard};
use crate::face::{Emotion, FaceDirector};
use crate::protocol::{JokePattern, PeerValue};
use crate::sched::Clock;
use crate::text::normalize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

const KNOCK_TRIGGER: &str = "knock knock";
/// Shown while the character "thinks" about a response.
const THINKING: &str = "...";
/// Delay between the reaction animator starting and the response text reveal.
const RESPONSE_REVEAL_DELAY: Duration = Duration::from_secs(2);
/// How long a revealed response lingers before the conversation resets.
const RESPONSE_IDLE_RETURN: Duration = Duration::from_secs(10);

/// Where displayed dialogue goes. `bounce` asks the presentation layer for a
/// brief emphasis nod of the whole face.
pub trait ReplySink {
    fn reply(&self, message: &str, bounce: bool);
}

pub struct Orchestrator {
    conversation: Rc<Conversation>,
    director: Rc<FaceDirector>,
    patterns: RefCell<Vec<JokePattern>>,
    sink: Rc<dyn ReplySink>,
    clock: Rc<dyn Clock>,
}

impl Orchestrator {
    pub fn new(
        director: Rc<FaceDirector>,
        sink: Rc<dyn ReplySink>,
        clock: Rc<dyn Clock>,
    ) -> Rc<Self> {
        let orchestrator = Rc::new(Self {
            conversation: Rc::new(Conversation::new()),
            director,
            patterns: RefCell::new(Self::default_patterns()),
            sink,
            clock,
        });

        let weak = Rc::downgrade(&orchestrator);
        orchestrator
            .conversation
            .set_observer(Rc::new(move |old, new| {
                if let Some(this) = weak.upgrade() {
                    this.on_transition(old, new);
                }
            }));

        // The face idles neutrally before any dialogue arrives.
        orchestrator.director.move_to_emotion(Emotion::Neutral, None);
        orchestrator
    }

    fn default_patterns() -> Vec<JokePattern> {
        vec![
            JokePattern::new("boo", "cry", "That's a classic!", Face::Laughing),
            JokePattern::new("uint", "uint", "Ummm...really?", Face::Annoyed),
        ]
    }

    /// Route one line of typed dialogue by the current state.
    ///
    /// # Panics
    ///
    /// Panics if the conversation sits in a `Processing*` state, which the
    /// observer must always have resolved synchronously.
    pub fn process_conversation_line(&self, text: &str) {
        use ConversationState as S;
        match self.conversation.current_state() {
            S::WaitingForKnock | S::Response { .. } => {
                self.conversation.transition(S::ProcessingKnock {
                    knock: text.to_string(),
                });
            }
            S::WaitingForReply => {
                self.conversation.transition(S::WaitingForPunchline {
                    who: text.to_string(),
                });
            }
            S::WaitingForPunchline { who } => {
                self.conversation.transition(S::ProcessingPunchline {
                    who,
                    punchline: text.to_string(),
                });
            }
            state @ (S::ProcessingKnock { .. } | S::ProcessingPunchline { .. }) => {
                panic!("dialogue arrived while still in transient state {state:?}");
            }
        }
    }

    /// Register a joke pattern. A pattern with the same setup/punchline pair
    /// is replaced and the new pattern moves to the end of the search order.
    pub fn add_pattern(&self, pattern: JokePattern) {
        info!(setup = %pattern.setup, punchline = %pattern.punchline, "joke pattern added");
        let mut patterns = self.patterns.borrow_mut();
        patterns.retain(|p| !(p.setup == pattern.setup && p.punchline == pattern.punchline));
        patterns.push(pattern);
    }

    fn on_transition(self: &Rc<Self>, _old: &ConversationState, new: &ConversationState) {
        use ConversationState as S;
        match new {
            S::WaitingForKnock => {
                let guard = GenerationGuard::capture(&self.conversation);
                let weak = Rc::downgrade(self);
                self.director.move_to_emotion(
                    Emotion::Neutral,
                    Some(Box::new(move |skipped| {
                        if skipped {
                            return;
                        }
                        if let Some(this) = weak.upgrade() {
                            guard.run(|| this.sink.reply("", false));
                        }
                    })),
                );
            }
            S::ProcessingKnock { knock } => {
                if normalize(knock).contains(KNOCK_TRIGGER) {
                    if self.director.current_emotion() != Emotion::Neutral {
                        self.director.move_to_emotion(Emotion::Neutral, None);
                    }
                    self.sink.reply("Who's there?", true);
                    self.conversation.transition(S::WaitingForReply);
                } else {
                    self.sink.reply(THINKING, false);
                    self.conversation.transition(S::Response {
                        message: "I only understand\nknock, knock jokes".to_string(),
                        face: Face::Confused,
                    });
                }
            }
            // The neutral face was already established by WaitingForKnock.
            S::WaitingForReply => {}
            S::WaitingForPunchline { who } => {
                self.sink.reply(&format!("{who} who?"), true);
            }
            S::ProcessingPunchline { who, punchline } => {
                self.sink.reply(THINKING, false);
                let next = match self.find_response(who, punchline) {
                    Some((message, face)) => S::Response { message, face },
                    None => S::Response {
                        message: "I don't get it.".to_string(),
                        face: Face::Confused,
                    },
                };
                self.conversation.transition(next);
            }
            S::Response { message, face } => {
                self.show_reaction(message.clone(), *face);
            }
        }
    }

    /// First pattern whose setup appears in the normalized `who` and whose
    /// punchline appears in the normalized `punchline`.
    fn find_response(&self, who: &str, punchline: &str) -> Option<(String, Face)> {
        let who = normalize(who);
        let punchline = normalize(punchline);
        self.patterns
            .borrow()
            .iter()
            .find(|pattern| {
                who.contains(&normalize(&pattern.setup))
                    && punchline.contains(&normalize(&pattern.punchline))
            })
            .map(|pattern| (pattern.response.clone(), pattern.face))
    }

    /// Move the face to the reaction emotion, then reveal the message after a
    /// beat and schedule the return to idle. Every step checks the generation
    /// captured here; a new knock in the meantime abandons the whole tail.
    fn show_reaction(self: &Rc<Self>, message: String, face: Face) {
        let guard = GenerationGuard::capture(&self.conversation);
        self.sink.reply(THINKING, false);

        let weak = Rc::downgrade(self);
        self.director.move_to_emotion(
            face.into(),
            Some(Box::new(move |skipped| {
                if skipped || !guard.is_current() {
                    return;
                }
                let Some(this) = weak.upgrade() else {
                    return;
                };
                let inner = Rc::downgrade(&this);
                this.clock.after(
                    RESPONSE_REVEAL_DELAY,
                    Box::new(move || {
                        let Some(this) = inner.upgrade() else {
                            return;
                        };
                        guard.run(|| {
                            this.sink.reply(&message, false);
                            this.schedule_return_to_waiting();
                        });
                    }),
                );
            })),
        );
    }

    fn schedule_return_to_waiting(self: &Rc<Self>) {
        let guard = GenerationGuard::capture(&self.conversation);
        let weak = Rc::downgrade(self);
        self.clock.after(
            RESPONSE_IDLE_RETURN,
            Box::new(move || {
                let Some(this) = weak.upgrade() else {
                    return;
                };
                guard.run(|| {
                    this.conversation
                        .transition(ConversationState::WaitingForKnock);
                });
            }),
        );
    }

    // ========================================================================
    // Peer boundary
    // ========================================================================

    /// Dispatch one value received from the peer.
    pub fn receive(&self, message: PeerValue) {
        debug!(?message, "peer value received");
        match message {
            PeerValue::String(text) => self.process_conversation_line(&text),
            PeerValue::Integer(number) => {
                self.sink
                    .reply(&format!("You sent me the number {number}!"), false);
            }
            PeerValue::FloatingPoint(number) => {
                self.sink
                    .reply(&format!("You sent me the number {number}!"), false);
            }
            PeerValue::Boolean(value) => {
                self.sink
                    .reply(&format!("You sent me the value {value}!"), false);
            }
            PeerValue::Date(date) => {
                self.sink.reply(&format!("You sent me the date {date}"), false);
            }
            PeerValue::Data(_) => {
                self.sink
                    .reply("Hmm. I don't know what to do with data values.", false);
            }
            PeerValue::Array(_) => {
                self.sink
                    .reply("Hmm. I don't know what to do with an array.", false);
            }
            PeerValue::Dictionary(entries) => self.run_command(&entries),
        }
    }

    fn run_command(&self, entries: &BTreeMap<String, PeerValue>) {
        let Some(PeerValue::String(command)) = entries.get("Command") else {
            self.sink.reply(
                "Hmm. I was sent a dictionary, but it was missing a \"Command\".",
                false,
            );
            return;
        };

        match command.as_str() {
            "Echo" => {
                if let Some(PeerValue::String(message)) = entries.get("Message") {
                    self.sink.reply(message, true);
                } else {
                    self.sink.reply(
                        "Hmm. I was told to \"Echo\" but there was no \"Message\".",
                        false,
                    );
                }
            }
            "AddJoke" => {
                if let Some(pattern_value) = entries.get("Pattern") {
                    match JokePattern::from_peer_value(pattern_value) {
                        Ok(pattern) => self.add_pattern(pattern),
                        Err(error) => {
                            self.sink.reply(
                                &format!(
                                    "Hmm. I don't know how to interpret the joke pattern you sent. {error}"
                                ),
                                false,
                            );
                        }
                    }
                } else {
                    self.sink.reply(
                        "Hmm. I was told to \"AddJoke\" but there was no \"Pattern\" to add.",
                        false,
                    );
                }
            }
            other => {
                self.sink
                    .reply(&format!("Hmm. I don't recognize the command \"{other}\"."), false);
            }
        }
    }
}
