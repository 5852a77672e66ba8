use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Species and shape predictions for an image the gating model accepted as a plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InferenceResult {
    pub species: String,
    pub species_confidence: f64,
    pub shape: String,
    pub shape_confidence: f64,
}

/// What the classifier decided about an uploaded image.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    Plant(InferenceResult),
    NotAPlant,
}

impl ClassificationOutcome {
    pub fn is_plant(&self) -> bool {
        matches!(self, ClassificationOutcome::Plant(_))
    }
}
