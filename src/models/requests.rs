use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::{PetFilters, PetProfile};

/// Request to score a single candidate against a subject
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompatibilityRequest {
    pub subject: PetProfile,
    pub candidate: PetProfile,
}

/// Request to rank a list of candidates against a subject
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RankRequest {
    pub subject: PetProfile,
    #[validate(length(max = 5000))]
    pub candidates: Vec<PetProfile>,
    #[serde(default)]
    pub filters: Option<PetFilters>,
    #[validate(range(min = 1, max = 1000))]
    #[serde(default)]
    pub limit: Option<u16>,
}

/// Query string of `GET /api/pets/{petId}/playdate-matches`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaydateMatchQuery {
    /// Maximum distance in km
    #[validate(range(min = 1.0, max = 100.0))]
    pub distance: Option<f64>,
    pub size: Option<String>,
    pub species: Option<String>,
    pub intent: Option<String>,
    pub breed: Option<String>,
    pub gender: Option<String>,
    #[validate(range(min = 0.0))]
    pub min_age: Option<f64>,
    #[validate(range(min = 0.0))]
    pub max_age: Option<f64>,
    /// Comma-separated personality tags the candidate must carry
    pub tags: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u16>,
}

impl PlaydateMatchQuery {
    pub fn to_filters(&self) -> PetFilters {
        PetFilters {
            species: self.species.clone(),
            intent: self.intent.clone(),
            max_distance: self.distance,
            min_age: self.min_age,
            max_age: self.max_age,
            size: self.size.clone(),
            gender: self.gender.clone(),
            breed: self.breed.clone(),
            personality_tags: self
                .tags
                .as_deref()
                .map(|tags| {
                    tags.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            exclude_ids: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_to_filters_splits_tags() {
        let query = PlaydateMatchQuery {
            distance: Some(10.0),
            size: Some("medium".to_string()),
            tags: Some("friendly, energetic,,".to_string()),
            ..Default::default()
        };

        let filters = query.to_filters();
        assert_eq!(filters.max_distance, Some(10.0));
        assert_eq!(filters.size.as_deref(), Some("medium"));
        assert_eq!(filters.personality_tags, vec!["friendly", "energetic"]);
    }

    #[test]
    fn test_query_validation_rejects_distance_out_of_range() {
        let query = PlaydateMatchQuery {
            distance: Some(250.0),
            ..Default::default()
        };
        assert!(query.validate().is_err());
    }
}
