// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BoundingBox, CompatibilityFactors, CompatibilityResult, GeoPoint, Intent, PetFilters,
    PetProfile, PetSize, PlaydateMatch, ScoringWeights, Sociability, Species,
};
pub use requests::{CompatibilityRequest, PlaydateMatchQuery, RankRequest};
pub use responses::{ErrorResponse, HealthResponse, PlaydateMatchesResponse, RankResponse};
