//! Acknowledgement shared by the document write routes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dto::rankings::Timestamp;

/// Acknowledgement returned after a document write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WriteAck {
    /// Always `true`; failures answer with an error status instead.
    pub success: bool,
    /// Server clock at the time of the write, in milliseconds.
    pub timestamp: Timestamp,
}
