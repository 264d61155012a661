//! What an overlay renders, folded from accepted envelopes.

use crate::{
    catalog,
    dto::{
        envelope::Envelope,
        rankings::{AnimationSettings, Entity, LayoutSettings, Mode, RankOffsets, Timestamp},
    },
};

/// Effective display state. Mode and list are always replaced; parameter
/// sets are only replaced when the envelope carries them.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    /// Mode of the list on screen.
    pub mode: Mode,
    /// Rows on screen.
    pub entities: Vec<Entity>,
    /// Layout in effect.
    pub layout: LayoutSettings,
    /// Animation in effect.
    pub animation: AnimationSettings,
    /// Pixel offsets by rank; ranks without an entry sit at `0`.
    pub rank_offsets: RankOffsets,
    /// Timestamp of the last applied envelope, `0` while showing the seed list.
    pub updated_at: Timestamp,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            mode: catalog::INITIAL_MODE,
            entities: catalog::initial_list(catalog::INITIAL_MODE),
            layout: LayoutSettings::default(),
            animation: AnimationSettings::default(),
            rank_offsets: RankOffsets::new(),
            updated_at: 0,
        }
    }
}

impl DisplayState {
    /// Fold an accepted envelope into the state.
    pub fn apply(&mut self, envelope: &Envelope) {
        self.mode = envelope.mode();
        self.entities = envelope.entities().to_vec();
        if let Some(layout) = envelope.layout() {
            self.layout = *layout;
        }
        if let Some(animation) = envelope.animation() {
            self.animation = *animation;
        }
        if let Some(offsets) = envelope.rank_offsets() {
            self.rank_offsets = offsets.clone();
        }
        self.updated_at = envelope.timestamp();
    }

    /// Pixel offset to apply to the row showing `rank`.
    pub fn offset_for_rank(&self, rank: u32) -> i32 {
        self.rank_offsets.get(&rank).copied().unwrap_or(0)
    }

    /// One line per row, headers in brackets: `1. Morocco (ma)`.
    pub fn render_lines(&self) -> Vec<String> {
        let mut position = 0;
        self.entities
            .iter()
            .map(|entity| {
                if entity.is_header {
                    format!("[{}]", entity.name)
                } else {
                    position += 1;
                    format!("{position}. {} ({})", entity.name, entity.iso_code)
                }
            })
            .collect()
    }
}
