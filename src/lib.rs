//! PawfectMatch - pet compatibility scoring and playdate matching
//!
//! This library provides the single compatibility scorer shared by the
//! PawfectMatch server and mobile client, the ranking pipeline built on it,
//! and the HTTP service that exposes playdate matches.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    compute_compatibility, rank_candidates, Matcher, ScoringError,
    distance::{haversine_distance, calculate_bounding_box},
};
pub use models::{
    CompatibilityResult, PetFilters, PetProfile, PlaydateMatch, ScoringWeights,
};
