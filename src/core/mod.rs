// Core algorithm exports
pub mod activities;
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod scoring;

pub use activities::{recommended_activities, safety_notes};
pub use distance::{calculate_bounding_box, distance_between, haversine_distance, is_within_bounding_box};
pub use filters::{apply_filters, matches_filters};
pub use matcher::{rank_candidates, ranking_order, sort_recommendations, MatchResult, Matcher, RankKey};
pub use scoring::{calculate_compatibility, compute_compatibility, validate_profile, ProfileRole, ScoringError};
