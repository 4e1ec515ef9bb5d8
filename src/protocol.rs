//! Peer boundary value model
//!
//! The peer process exchanges one JSON-encoded [`PeerValue`] per line. A bare
//! string is a line of dialogue; dictionaries carry commands ("Echo",
//! "AddJoke"). Joke patterns travel as dictionaries with Setup / Punchline /
//! Response / Face string entries and decode with a specific failure reason
//! so the peer gets a descriptive complaint instead of a dropped message.

use crate::conversation::Face;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A value received from (or sent to) the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PeerValue {
    String(String),
    Integer(i64),
    FloatingPoint(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Data(#[serde(with = "base64_bytes")] Vec<u8>),
    Array(Vec<PeerValue>),
    Dictionary(BTreeMap<String, PeerValue>),
}

impl PeerValue {
    pub fn string(text: impl Into<String>) -> Self {
        PeerValue::String(text.into())
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// The frame written back to the peer for every displayed reply.
#[derive(Debug, Serialize)]
pub struct ReplyFrame<'a> {
    pub reply: &'a str,
    pub bounce: bool,
}

// ============================================================================
// Joke patterns
// ============================================================================

const SETUP_KEY: &str = "Setup";
const PUNCHLINE_KEY: &str = "Punchline";
const RESPONSE_KEY: &str = "Response";
const FACE_KEY: &str = "Face";

/// A knock-knock joke pattern. `setup` and `punchline` are matched against
/// normalized input (see `crate::text::normalize`); `response` is shown under
/// the face with the requested expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JokePattern {
    pub setup: String,
    pub punchline: String,
    pub response: String,
    pub face: Face,
}

impl JokePattern {
    pub fn new(
        setup: impl Into<String>,
        punchline: impl Into<String>,
        response: impl Into<String>,
        face: Face,
    ) -> Self {
        Self {
            setup: setup.into(),
            punchline: punchline.into(),
            response: response.into(),
            face,
        }
    }
}

/// Why a peer-supplied pattern record failed to decode. Never fatal; the
/// message text is surfaced to the peer verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternDecodeError {
    #[error("The value of \"Pattern\" was not a dictionary.")]
    NotARecord,
    #[error("Missing the setup string.")]
    MissingSetup,
    #[error("Missing the punchline string.")]
    MissingPunchline,
    #[error("Missing the response string.")]
    MissingResponse,
    #[error("Missing the face string.")]
    MissingFace,
    #[error("Unknown face string \"{0}\".")]
    UnknownFace(String),
}

fn face_name(face: Face) -> &'static str {
    match face {
        Face::Laughing => "Laughing",
        Face::Confused => "Confused",
        Face::Annoyed => "Annoyed",
    }
}

fn string_entry<'a>(
    record: &'a BTreeMap<String, PeerValue>,
    key: &str,
) -> Option<&'a str> {
    match record.get(key) {
        Some(PeerValue::String(s)) => Some(s),
        _ => None,
    }
}

impl JokePattern {
    /// Decode a pattern from a peer dictionary value.
    pub fn from_peer_value(value: &PeerValue) -> Result<Self, PatternDecodeError> {
        let PeerValue::Dictionary(record) = value else {
            return Err(PatternDecodeError::NotARecord);
        };
        let setup = string_entry(record, SETUP_KEY).ok_or(PatternDecodeError::MissingSetup)?;
        let punchline =
            string_entry(record, PUNCHLINE_KEY).ok_or(PatternDecodeError::MissingPunchline)?;
        let response =
            string_entry(record, RESPONSE_KEY).ok_or(PatternDecodeError::MissingResponse)?;
        let face_string =
            string_entry(record, FACE_KEY).ok_or(PatternDecodeError::MissingFace)?;

        let face = match face_string {
            "Laughing" => Face::Laughing,
            "Confused" => Face::Confused,
            "Annoyed" => Face::Annoyed,
            other => return Err(PatternDecodeError::UnknownFace(other.to_string())),
        };

        Ok(JokePattern::new(setup, punchline, response, face))
    }

    /// Encode this pattern as a peer dictionary value.
    pub fn to_peer_value(&self) -> PeerValue {
        let mut record = BTreeMap::new();
        record.insert(SETUP_KEY.to_string(), PeerValue::string(&self.setup));
        record.insert(
            PUNCHLINE_KEY.to_string(),
            PeerValue::string(&self.punchline),
        );
        record.insert(RESPONSE_KEY.to_string(), PeerValue::string(&self.response));
        record.insert(FACE_KEY.to_string(), PeerValue::string(face_name(self.face)));
        PeerValue::Dictionary(record)
    }
}
