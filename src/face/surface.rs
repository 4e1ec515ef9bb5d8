//! The shared visual surface animators manipulate

use std::cell::Cell;

/// Sprite frame currently shown on the face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    NeutralOpen,
    NeutralBlink,
    LaughRise,
    LaughTears,
    Confused,
    Annoyed,
}

/// Affine pose of the face: rotation, translation, and squeeze.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub tilt: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        tilt: 0.0,
        offset_x: 0.0,
        offset_y: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
    };

    pub fn tilted(radians: f32) -> Self {
        Pose {
            tilt: radians,
            ..Self::IDENTITY
        }
    }

    pub fn shifted(x: f32, y: f32) -> Self {
        Pose {
            offset_x: x,
            offset_y: y,
            ..Self::IDENTITY
        }
    }

    pub fn squeezed_x(scale: f32) -> Self {
        Pose {
            scale_x: scale,
            ..Self::IDENTITY
        }
    }

    pub fn squeezed_y(scale: f32) -> Self {
        Pose {
            scale_y: scale,
            ..Self::IDENTITY
        }
    }

    pub fn with_tilt(self, radians: f32) -> Self {
        Pose {
            tilt: radians,
            ..self
        }
    }
}

/// Renderable face state. Animators reach it through a `Weak` reference: if
/// the surface is torn down they must treat themselves as already stopped.
///
/// Every mutation bumps a counter so tests can assert that a stopped
/// animator never touches the surface again.
pub struct FaceSurface {
    frame: Cell<Frame>,
    pose: Cell<Pose>,
    mutations: Cell<u64>,
}

impl Default for FaceSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceSurface {
    pub fn new() -> Self {
        Self {
            frame: Cell::new(Frame::NeutralOpen),
            pose: Cell::new(Pose::IDENTITY),
            mutations: Cell::new(0),
        }
    }

    pub fn frame(&self) -> Frame {
        self.frame.get()
    }

    pub fn pose(&self) -> Pose {
        self.pose.get()
    }

    pub fn set_frame(&self, frame: Frame) {
        self.mutations.set(self.mutations.get() + 1);
        self.frame.set(frame);
    }

    pub fn set_pose(&self, pose: Pose) {
        self.mutations.set(self.mutations.get() + 1);
        self.pose.set(pose);
    }

    pub fn mutation_count(&self) -> u64 {
        self.mutations.get()
    }
}
