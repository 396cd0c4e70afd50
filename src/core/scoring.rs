use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::core::distance::distance_between;
use crate::models::{
    CompatibilityFactors, CompatibilityResult, Intent, PetProfile, PetSize, ScoringWeights,
    Species,
};

/// Normalized sub-score a size, age or personality factor must exceed
/// before it is listed as a reason
pub const DEFAULT_REASON_THRESHOLD: f64 = 0.7;

/// Sub-score lost per step on the size scale
const SIZE_STEP_PENALTY: f64 = 0.25;

/// Age gap, in years, at which the age sub-score reaches zero
const AGE_SPAN_YEARS: f64 = 10.0;

/// Which side of the pair a profile is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileRole {
    Subject,
    Candidate,
}

impl fmt::Display for ProfileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileRole::Subject => write!(f, "subject"),
            ProfileRole::Candidate => write!(f, "candidate"),
        }
    }
}

/// Errors raised by the compatibility scorer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("Invalid {role} profile '{pet_id}': missing or malformed {field}")]
    InvalidProfile {
        role: ProfileRole,
        pet_id: String,
        field: &'static str,
    },
}

/// The fields every scorable profile must carry
#[derive(Debug, Clone, Copy)]
struct RequiredFields {
    species: Species,
    size: PetSize,
    age: f64,
}

fn required_fields(profile: &PetProfile, role: ProfileRole) -> Result<RequiredFields, ScoringError> {
    let invalid = |field| ScoringError::InvalidProfile {
        role,
        pet_id: profile.id.clone(),
        field,
    };

    let species = profile.species.ok_or_else(|| invalid("species"))?;
    let size = profile.size.ok_or_else(|| invalid("size"))?;
    let age = profile
        .age
        .filter(|age| age.is_finite() && *age >= 0.0)
        .ok_or_else(|| invalid("age"))?;

    Ok(RequiredFields { species, size, age })
}

/// Check that a profile carries species, size and a valid age
pub fn validate_profile(profile: &PetProfile, role: ProfileRole) -> Result<(), ScoringError> {
    required_fields(profile, role).map(|_| ())
}

/// Score a candidate against a subject with the default weights
pub fn compute_compatibility(
    subject: &PetProfile,
    candidate: &PetProfile,
) -> Result<CompatibilityResult, ScoringError> {
    calculate_compatibility(
        subject,
        candidate,
        &ScoringWeights::default(),
        DEFAULT_REASON_THRESHOLD,
    )
}

/// Calculate a compatibility score (0-100) for a candidate
///
/// Scoring formula:
/// score = (
///     species_match  * weights.species +      # equal species
///     intent_match   * weights.intent +       # equal intent, or either is "all"
///     size_score     * weights.size +         # 1 - 0.25 per step on the size scale
///     age_score      * weights.age +          # 1 - |age gap| / 10 years
///     tag_overlap    * weights.personality    # shared tags / larger tag set
/// )
///
/// Distance never feeds into the score; it is reported in `distance_km`.
pub fn calculate_compatibility(
    subject: &PetProfile,
    candidate: &PetProfile,
    weights: &ScoringWeights,
    reason_threshold: f64,
) -> Result<CompatibilityResult, ScoringError> {
    let a = required_fields(subject, ProfileRole::Subject)?;
    let b = required_fields(candidate, ProfileRole::Candidate)?;

    let mut factors = CompatibilityFactors::default();
    let mut reasons = Vec::new();

    if a.species == b.species {
        factors.species = weights.species;
        reasons.push(format!("Same species: {}", a.species.as_str()));
    }

    if let (Some(x), Some(y)) = (subject.intent, candidate.intent) {
        if x.is_compatible_with(&y) {
            factors.intent = weights.intent;
            let shown = if x == Intent::All { y } else { x };
            reasons.push(format!("Compatible intent: {}", shown.as_str()));
        }
    }

    let size = size_score(a.size, b.size);
    factors.size = weights.size * size;
    if size > reason_threshold {
        if a.size == b.size {
            reasons.push(format!("Same size: {}", a.size.as_str()));
        } else {
            reasons.push(format!(
                "Similar size: {} and {}",
                a.size.as_str(),
                b.size.as_str()
            ));
        }
    }

    let age = age_score(a.age, b.age);
    factors.age = weights.age * age;
    if age > reason_threshold {
        reasons.push(format!("Close in age: {:.1} years apart", (a.age - b.age).abs()));
    }

    let tags_a = tag_set(subject);
    let tags_b = tag_set(candidate);
    let overlap = tag_overlap_score(&tags_a, &tags_b);
    factors.personality = weights.personality * overlap;
    if overlap > reason_threshold {
        let shared: Vec<&str> = tags_a.intersection(&tags_b).map(String::as_str).collect();
        reasons.push(format!("Shared personality: {}", shared.join(", ")));
    }

    let distance_km = distance_between(subject.location.as_ref(), candidate.location.as_ref());

    Ok(CompatibilityResult {
        candidate_id: candidate.id.clone(),
        candidate_name: candidate.name.clone(),
        score: clamp_score(factors.total()),
        reasons,
        factors,
        distance_km,
    })
}

/// Size sub-score (0-1), losing a quarter per step on the size scale
#[inline]
pub fn size_score(a: PetSize, b: PetSize) -> f64 {
    let steps = f64::from(a.index().abs_diff(b.index()));
    (1.0 - steps * SIZE_STEP_PENALTY).max(0.0)
}

/// Age sub-score (0-1), reaching zero at a ten year gap
#[inline]
pub fn age_score(a: f64, b: f64) -> f64 {
    (1.0 - (a - b).abs() / AGE_SPAN_YEARS).max(0.0)
}

/// Overlap of two tag sets (0-1) relative to the larger set
#[inline]
pub fn tag_overlap_score(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let shared = a.intersection(b).count() as f64;
    let largest = a.len().max(b.len()).max(1) as f64;
    shared / largest
}

/// Personality tags and play styles, trimmed, lowercased and de-duplicated
pub fn tag_set(profile: &PetProfile) -> BTreeSet<String> {
    profile
        .personality_tags
        .iter()
        .chain(profile.play_style.iter())
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Round to the nearest integer and clamp to [0, 100]
#[inline]
fn clamp_score(total: f64) -> u8 {
    if total.is_nan() {
        return 0;
    }
    total.round().clamp(0.0, 100.0) as u8
}
