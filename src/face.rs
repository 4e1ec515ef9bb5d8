//! Facial expression engine
//!
//! The face is an abstract visual surface (sprite frame + affine pose)
//! animated by exactly one animator at a time. The [`FaceDirector`] owns the
//! hand-off protocol between animators; the four variants live in their own
//! modules and share the start/stop choreography in `animator`.

pub mod animator;
mod annoyed;
mod confused;
pub mod director;
mod laughing;
mod neutral;
pub mod surface;

pub use animator::{Animator, DoneCallback};
pub use director::{FaceDirector, StartedCallback};
pub use surface::{FaceSurface, Frame, Pose};

use crate::conversation::Face;

/// What the director actually renders. `Face` (the scripted response intent)
/// maps onto the non-neutral subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emotion {
    Neutral,
    Laughing,
    Confused,
    Annoyed,
}

impl From<Face> for Emotion {
    fn from(face: Face) -> Self {
        match face {
            Face::Laughing => Emotion::Laughing,
            Face::Confused => Emotion::Confused,
            Face::Annoyed => Emotion::Annoyed,
        }
    }
}
