//! Ranked entities, list contexts, and the presentation parameter sets carried
//! alongside a ranking update.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Milliseconds since the Unix epoch, assigned by the publisher at send time.
pub type Timestamp = u64;

/// Per-rank vertical adjustment in pixels, keyed by rank number.
pub type RankOffsets = BTreeMap<u32, i32>;

/// Smallest pixel offset accepted for a rank.
pub const MIN_RANK_OFFSET: i32 = -20;
/// Largest pixel offset accepted for a rank.
pub const MAX_RANK_OFFSET: i32 = 20;

/// Independently addressed ranking list (a competition track or group).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Mode {
    #[serde(rename = "Rocket League")]
    RocketLeague,
    #[serde(rename = "eConsole")]
    EConsole,
    #[serde(rename = "eMobile")]
    EMobile,
    #[serde(rename = "eConsole Group A")]
    EConsoleGroupA,
    #[serde(rename = "eConsole Group B")]
    EConsoleGroupB,
    #[serde(rename = "eMobile Group A")]
    EMobileGroupA,
    #[serde(rename = "eMobile Group B")]
    EMobileGroupB,
}

impl Mode {
    /// Every mode, in the order the editor lists them.
    pub const ALL: [Mode; 7] = [
        Mode::RocketLeague,
        Mode::EConsole,
        Mode::EMobile,
        Mode::EConsoleGroupA,
        Mode::EConsoleGroupB,
        Mode::EMobileGroupA,
        Mode::EMobileGroupB,
    ];

    /// Display label, identical to the wire representation.
    pub fn label(self) -> &'static str {
        match self {
            Mode::RocketLeague => "Rocket League",
            Mode::EConsole => "eConsole",
            Mode::EMobile => "eMobile",
            Mode::EConsoleGroupA => "eConsole Group A",
            Mode::EConsoleGroupB => "eConsole Group B",
            Mode::EMobileGroupA => "eMobile Group A",
            Mode::EMobileGroupB => "eMobile Group B",
        }
    }

    /// Resolve a mode from its display label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.label() == label)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of a ranking list: a country, or a section header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Unique within one list.
    pub id: String,
    /// Display name, or the header text.
    pub name: String,
    /// Flag lookup code; empty for headers.
    #[serde(default)]
    pub iso_code: String,
    /// Position in the list; `0` for headers.
    #[serde(default)]
    pub rank: i32,
    /// Section header rather than a ranked country.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_header: bool,
}

impl Entity {
    /// Build a ranked data row.
    pub fn ranked(
        id: impl Into<String>,
        name: impl Into<String>,
        iso_code: impl Into<String>,
        rank: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            iso_code: iso_code.into(),
            rank,
            is_header: false,
        }
    }

    /// Build a section header row. Headers carry no rank and no flag.
    pub fn header(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            iso_code: String::new(),
            rank: 0,
            is_header: true,
        }
    }
}

/// Sizing and horizontal offsets of the card layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutSettings {
    /// Row text size, in pixels.
    pub font_size: f64,
    /// Horizontal offset of the name, in pixels.
    pub text_position_x: f64,
    /// Horizontal offset of the rank badge, in pixels.
    pub rank_position_x: f64,
    /// Multiplier applied to the rank badge.
    pub rank_size: f64,
    /// Multiplier applied to the flag.
    pub flag_size: f64,
    /// Horizontal offset of the flag, in pixels.
    pub flag_position_x: f64,
    /// Header text size, in pixels.
    pub header_font_size: f64,
    /// Horizontal offset of header rows, in pixels.
    pub header_position_x: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            font_size: 24.0,
            text_position_x: 0.0,
            rank_position_x: 0.0,
            rank_size: 1.0,
            flag_size: 1.0,
            flag_position_x: 0.0,
            header_font_size: 36.0,
            header_position_x: 0.0,
        }
    }
}

/// Spring parameters driving the reorder animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationSettings {
    /// Spring stiffness of the reorder animation.
    pub stiffness: f64,
    /// Spring damping.
    pub damping: f64,
    /// Mass of each moving row.
    pub mass: f64,
    /// Layout animation duration, in seconds.
    pub layout_duration: f64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            stiffness: 300.0,
            damping: 30.0,
            mass: 1.0,
            layout_duration: 0.8,
        }
    }
}
