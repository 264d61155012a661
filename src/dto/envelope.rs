//! The unit of synchronization exchanged over every transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::dto::rankings::{AnimationSettings, Entity, LayoutSettings, Mode, RankOffsets, Timestamp};

/// Discriminator value identifying a ranking update payload.
pub const UPDATE_RANKINGS: &str = "UPDATE_RANKINGS";

/// Immutable ranking update: one mode, its full ordered list, optional
/// presentation parameters, and the publisher's timestamp.
///
/// Optional fields left unset mean "keep whatever the receiver already has",
/// never "reset to default".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "TaggedMessage", try_from = "TaggedMessage")]
pub struct Envelope {
    mode: Mode,
    entities: Vec<Entity>,
    layout: Option<LayoutSettings>,
    animation: Option<AnimationSettings>,
    rank_offsets: Option<RankOffsets>,
    timestamp: Option<Timestamp>,
}

impl Envelope {
    /// Start an envelope for `mode` carrying `entities`; every other field is unset.
    pub fn new(mode: Mode, entities: Vec<Entity>) -> Self {
        Self {
            mode,
            entities,
            layout: None,
            animation: None,
            rank_offsets: None,
            timestamp: None,
        }
    }

    /// Attach a layout parameter set.
    pub fn with_layout(mut self, layout: LayoutSettings) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Attach an animation parameter set.
    pub fn with_animation(mut self, animation: AnimationSettings) -> Self {
        self.animation = Some(animation);
        self
    }

    /// Attach per-rank position offsets.
    pub fn with_rank_offsets(mut self, offsets: RankOffsets) -> Self {
        self.rank_offsets = Some(offsets);
        self
    }

    /// Stamp the envelope with publisher time in milliseconds.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Competition mode the list belongs to.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Ordered rows to display.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Layout parameters, when the update carries them.
    pub fn layout(&self) -> Option<&LayoutSettings> {
        self.layout.as_ref()
    }

    /// Animation parameters, when the update carries them.
    pub fn animation(&self) -> Option<&AnimationSettings> {
        self.animation.as_ref()
    }

    /// Per-rank offsets, when the update carries them.
    pub fn rank_offsets(&self) -> Option<&RankOffsets> {
        self.rank_offsets.as_ref()
    }

    /// Publisher timestamp; `0` when the payload carried none.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp.unwrap_or(0)
    }

    /// Decode a raw payload, returning `None` for anything that is not a
    /// well-formed ranking update with at least one entity.
    pub fn decode(raw: &Value) -> Option<Self> {
        Self::deserialize(raw).ok()
    }

    /// Decode a JSON string, with the same fail-closed rules as [`Envelope::decode`].
    pub fn decode_str(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// Serialize into the tagged JSON form carried by every transport.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Reasons a tagged payload is refused while decoding.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The `countries` list is empty.
    #[error("ranking update carries no entities")]
    EmptyEntities,
}

/// Discriminator of the only message kind this crate understands.
#[derive(Clone, Copy, Serialize, Deserialize)]
enum MessageKind {
    #[serde(rename = "UPDATE_RANKINGS")]
    UpdateRankings,
}

/// Wire shape: a flat object carrying the `type` discriminator next to the
/// envelope fields. Kept flat so map keys such as rank numbers are decoded
/// straight from the JSON object.
#[skip_serializing_none]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaggedMessage {
    #[serde(rename = "type")]
    kind: MessageKind,
    game_mode: Mode,
    countries: Vec<Entity>,
    layout_settings: Option<LayoutSettings>,
    animation_settings: Option<AnimationSettings>,
    rank_position_offsets: Option<RankOffsets>,
    timestamp: Option<Timestamp>,
}

impl From<Envelope> for TaggedMessage {
    fn from(value: Envelope) -> Self {
        TaggedMessage {
            kind: MessageKind::UpdateRankings,
            game_mode: value.mode,
            countries: value.entities,
            layout_settings: value.layout,
            animation_settings: value.animation,
            rank_position_offsets: value.rank_offsets,
            timestamp: value.timestamp,
        }
    }
}

impl TryFrom<TaggedMessage> for Envelope {
    type Error = EnvelopeError;

    fn try_from(value: TaggedMessage) -> Result<Self, Self::Error> {
        let MessageKind::UpdateRankings = value.kind;
        if value.countries.is_empty() {
            return Err(EnvelopeError::EmptyEntities);
        }

        Ok(Self {
            mode: value.game_mode,
            entities: value.countries,
            layout: value.layout_settings,
            animation: value.animation_settings,
            rank_offsets: value.rank_position_offsets,
            timestamp: value.timestamp,
        })
    }
}
