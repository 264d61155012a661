//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dto::rankings::{MAX_RANK_OFFSET, MIN_RANK_OFFSET, RankOffsets};

/// Validates that every per-rank offset stays within the fine-tune range.
///
/// # Examples
///
/// ```ignore
/// validate_rank_offsets(&RankOffsets::from([(1, -20), (2, 20)])) // Ok
/// validate_rank_offsets(&RankOffsets::from([(3, 21)]))          // Err - out of range
/// validate_rank_offsets(&RankOffsets::from([(0, 1)]))           // Err - rank 0
/// ```
pub fn validate_rank_offsets(offsets: &RankOffsets) -> Result<(), ValidationError> {
    if offsets.contains_key(&0) {
        let mut err = ValidationError::new("rank_offset_rank");
        err.message = Some("Rank numbers start at 1".into());
        return Err(err);
    }

    if let Some((rank, offset)) = offsets
        .iter()
        .find(|(_, offset)| !(MIN_RANK_OFFSET..=MAX_RANK_OFFSET).contains(*offset))
    {
        let mut err = ValidationError::new("rank_offset_range");
        err.message = Some(
            format!(
                "Offset for rank {rank} must be between {MIN_RANK_OFFSET} and {MAX_RANK_OFFSET} (got {offset})"
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}
