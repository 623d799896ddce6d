use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::shared::validate_required;

/// Request body for creating a tag.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateTagRequest {
    /// Unique tag title (1-100 characters).
    #[schema(example = "Boundary")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TagResponse {
    #[schema(example = 3)]
    pub id: i32,
    #[schema(example = "Boundary")]
    pub title: String,
}

impl From<crate::entity::tag::Model> for TagResponse {
    fn from(m: crate::entity::tag::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
        }
    }
}

pub fn validate_create_tag(req: &CreateTagRequest) -> Result<(), AppError> {
    validate_required(&req.title, "Title", 100)
}
