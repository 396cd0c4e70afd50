use crate::core::scoring::tag_set;
use crate::models::{Intent, PetFilters, PetProfile, PetSize, PlaydateMatch, Species};

impl PetFilters {
    /// Species constraint, if the filter names a known species
    pub fn species_constraint(&self) -> Option<Species> {
        self.species.as_deref().and_then(|s| s.parse().ok())
    }

    /// Intent constraint. The wildcard intent is no constraint.
    pub fn intent_constraint(&self) -> Option<Intent> {
        self.intent
            .as_deref()
            .and_then(|s| s.parse().ok())
            .filter(|intent| *intent != Intent::All)
    }

    pub fn size_constraint(&self) -> Option<PetSize> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }

    /// Maximum distance in km, ignored when negative or not finite
    pub fn distance_constraint(&self) -> Option<f64> {
        self.max_distance.filter(|d| d.is_finite() && *d >= 0.0)
    }

    /// Age bounds. An inverted range is treated as no constraint.
    pub fn age_constraint(&self) -> (Option<f64>, Option<f64>) {
        let valid = |bound: Option<f64>| bound.filter(|b| b.is_finite() && *b >= 0.0);
        match (valid(self.min_age), valid(self.max_age)) {
            (Some(min), Some(max)) if min > max => (None, None),
            bounds => bounds,
        }
    }

    pub fn breed_constraint(&self) -> Option<&str> {
        text_constraint(self.breed.as_deref())
    }

    pub fn gender_constraint(&self) -> Option<&str> {
        text_constraint(self.gender.as_deref())
    }

    /// Personality tags a candidate must carry, trimmed and lowercased
    pub fn required_tags(&self) -> Vec<String> {
        self.personality_tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

fn text_constraint(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Check if a candidate passes the hard filters
///
/// `distance_km` is the distance between subject and candidate, when known.
/// A candidate with an unknown distance is not excluded by `maxDistance`.
#[inline]
pub fn matches_filters(
    candidate: &PetProfile,
    filters: &PetFilters,
    distance_km: Option<f64>,
) -> bool {
    if filters.exclude_ids.contains(&candidate.id) {
        return false;
    }

    if let Some(species) = filters.species_constraint() {
        if candidate.species != Some(species) {
            return false;
        }
    }

    if let Some(intent) = filters.intent_constraint() {
        match candidate.intent {
            Some(candidate_intent) if candidate_intent.is_compatible_with(&intent) => {}
            _ => return false,
        }
    }

    if let Some(size) = filters.size_constraint() {
        if candidate.size != Some(size) {
            return false;
        }
    }

    if let Some(gender) = filters.gender_constraint() {
        let same = candidate
            .gender
            .as_deref()
            .is_some_and(|g| g.trim().eq_ignore_ascii_case(gender));
        if !same {
            return false;
        }
    }

    if let Some(breed) = filters.breed_constraint() {
        let same = candidate
            .breed
            .as_deref()
            .is_some_and(|b| b.trim().eq_ignore_ascii_case(breed));
        if !same {
            return false;
        }
    }

    match filters.age_constraint() {
        (None, None) => {}
        (min, max) => {
            let Some(age) = candidate.age else {
                return false;
            };
            if min.is_some_and(|min| age < min) || max.is_some_and(|max| age > max) {
                return false;
            }
        }
    }

    let required = filters.required_tags();
    if !required.is_empty() {
        let tags = tag_set(candidate);
        if !required.iter().all(|t| tags.contains(t)) {
            return false;
        }
    }

    if let (Some(max), Some(distance)) = (filters.distance_constraint(), distance_km) {
        if distance > max {
            return false;
        }
    }

    true
}

/// Re-filter playdate matches received from the server
///
/// Keeps a match only when `pet2` passes the filters, measured against the
/// reported distance. Order is preserved.
pub fn apply_filters(matches: Vec<PlaydateMatch>, filters: &PetFilters) -> Vec<PlaydateMatch> {
    matches
        .into_iter()
        .filter(|m| m.pet2.id != m.pet1.id)
        .filter(|m| matches_filters(&m.pet2, filters, m.distance_km))
        .collect()
}
