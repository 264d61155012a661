//! Durable editor snapshot persisted through the admin-settings resource.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::dto::{
    rankings::{AnimationSettings, Entity, LayoutSettings, Mode, RankOffsets, Timestamp},
    validation::validate_rank_offsets,
};

/// Per-mode ranking lists, kept in editor order.
pub type RankingsByMode = IndexMap<Mode, Vec<Entity>>;

/// Everything needed to restore the editor: draft and live lists for every
/// mode, the selected mode, and the presentation parameters.
///
/// Not part of the broadcast protocol; displays never read it.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    /// Lists being edited, per mode.
    #[schema(value_type = Object)]
    pub draft_rankings: RankingsByMode,
    /// Lists last sent to the displays, per mode.
    #[schema(value_type = Object)]
    pub live_rankings: RankingsByMode,
    /// Layout last chosen in the editor.
    #[serde(default)]
    pub layout_settings: LayoutSettings,
    /// Animation last chosen in the editor.
    pub animation_settings: Option<AnimationSettings>,
    /// Mode open in the editor.
    pub selected_mode: Mode,
    /// Fine-tune Y position per rank number (-20 to +20 px).
    #[schema(value_type = Option<Object>)]
    pub rank_position_offsets: Option<RankOffsets>,
    /// When the snapshot was saved, in milliseconds.
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl Validate for AdminSettings {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(ref offsets) = self.rank_position_offsets {
            if let Err(e) = validate_rank_offsets(offsets) {
                errors.add("rank_position_offsets", e);
            }
        }

        for (field, rankings) in [
            ("draft_rankings", &self.draft_rankings),
            ("live_rankings", &self.live_rankings),
        ] {
            if let Err(e) = validate_unique_ids(rankings) {
                errors.add(field, e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Entity identifiers must be unique within each mode's list.
fn validate_unique_ids(rankings: &RankingsByMode) -> Result<(), ValidationError> {
    for (mode, list) in rankings {
        let mut seen = std::collections::HashSet::new();
        if let Some(duplicate) = list.iter().find(|entity| !seen.insert(entity.id.as_str())) {
            let mut err = ValidationError::new("duplicate_entity_id");
            err.message = Some(format!("duplicate id `{}` in {mode}", duplicate.id).into());
            return Err(err);
        }
    }
    Ok(())
}
