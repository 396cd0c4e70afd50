use std::cmp::Ordering;

use rayon::prelude::*;

use crate::core::{
    activities::{recommended_activities, safety_notes},
    distance::distance_between,
    filters::matches_filters,
    scoring::{
        calculate_compatibility, validate_profile, ProfileRole, ScoringError,
        DEFAULT_REASON_THRESHOLD,
    },
};
use crate::models::{CompatibilityResult, PetFilters, PetProfile, PlaydateMatch, ScoringWeights};

/// Candidate count at which scoring moves onto the rayon thread pool
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 256;

/// Number of playdate matches returned by default
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Result of the matching process
#[derive(Debug)]
pub struct MatchResult {
    pub matches: Vec<PlaydateMatch>,
    pub total_candidates: usize,
}

/// Fields that decide the position of a result in a ranking
#[derive(Debug, Clone, Copy)]
pub struct RankKey<'a> {
    pub score: u8,
    pub distance_km: Option<f64>,
    pub name: &'a str,
    pub id: &'a str,
}

impl CompatibilityResult {
    pub fn rank_key(&self) -> RankKey<'_> {
        RankKey {
            score: self.score,
            distance_km: self.distance_km,
            name: &self.candidate_name,
            id: &self.candidate_id,
        }
    }
}

impl PlaydateMatch {
    pub fn rank_key(&self) -> RankKey<'_> {
        RankKey {
            score: self.compatibility_score,
            distance_km: self.distance_km,
            name: &self.pet2.name,
            id: &self.pet2.id,
        }
    }
}

/// Distance as reported in a playdate match, rounded to 0.1 km
pub fn reported_distance(distance_km: f64) -> f64 {
    (distance_km * 10.0).round() / 10.0
}

/// Total order used for every ranking: score descending, then distance
/// ascending (unknown last), then name, then id
///
/// Distances are compared at the reported 0.1 km precision, so matches
/// re-sorted on the client land in the order the server ranked them.
pub fn ranking_order(a: &RankKey<'_>, b: &RankKey<'_>) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| match (a.distance_km.map(reported_distance), b.distance_km.map(reported_distance)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.name.cmp(b.name))
        .then_with(|| a.id.cmp(b.id))
}

/// Sort playdate matches with the same order the server ranks with
pub fn sort_recommendations(matches: &mut [PlaydateMatch]) {
    matches.sort_by(|a, b| ranking_order(&a.rank_key(), &b.rank_key()));
}

/// Rank candidates for a subject with the default weights
pub fn rank_candidates(
    subject: &PetProfile,
    candidates: &[PetProfile],
    filters: Option<&PetFilters>,
) -> Result<Vec<CompatibilityResult>, ScoringError> {
    Matcher::default().rank_candidates(subject, candidates, filters)
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Subject validation
/// 2. Hard filters (self, excluded ids, species, intent, size, ..., distance)
/// 3. Scoring, in parallel for large candidate lists
/// 4. Ranking by score, distance, name and id
///
/// A `Matcher` holds configuration only and can be shared freely.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    weights: ScoringWeights,
    reason_threshold: f64,
    parallel_threshold: usize,
}

impl Matcher {
    pub fn new(weights: ScoringWeights) -> Self {
        Self {
            weights,
            reason_threshold: DEFAULT_REASON_THRESHOLD,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    pub fn with_default_weights() -> Self {
        Self::new(ScoringWeights::default())
    }

    pub fn with_reason_threshold(mut self, threshold: f64) -> Self {
        self.reason_threshold = threshold;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a single candidate against the subject
    pub fn compute_compatibility(
        &self,
        subject: &PetProfile,
        candidate: &PetProfile,
    ) -> Result<CompatibilityResult, ScoringError> {
        calculate_compatibility(subject, candidate, &self.weights, self.reason_threshold)
    }

    /// Filter, score and rank candidates for a subject
    ///
    /// Candidates failing a hard filter are excluded without being scored.
    /// The call fails as a whole if the subject or any scored candidate is
    /// missing species, size or age.
    pub fn rank_candidates(
        &self,
        subject: &PetProfile,
        candidates: &[PetProfile],
        filters: Option<&PetFilters>,
    ) -> Result<Vec<CompatibilityResult>, ScoringError> {
        Ok(self
            .rank_with_profiles(subject, candidates, filters)?
            .into_iter()
            .map(|(_, result)| result)
            .collect())
    }

    /// Find the top playdate matches for a subject
    pub fn find_playdate_matches(
        &self,
        subject: &PetProfile,
        candidates: &[PetProfile],
        filters: Option<&PetFilters>,
        limit: usize,
    ) -> Result<MatchResult, ScoringError> {
        let total_candidates = candidates.len();

        let matches = self
            .rank_with_profiles(subject, candidates, filters)?
            .into_iter()
            .take(limit)
            .map(|(candidate, result)| build_playdate_match(subject, candidate, result))
            .collect();

        Ok(MatchResult {
            matches,
            total_candidates,
        })
    }

    fn rank_with_profiles<'a>(
        &self,
        subject: &PetProfile,
        candidates: &'a [PetProfile],
        filters: Option<&PetFilters>,
    ) -> Result<Vec<(&'a PetProfile, CompatibilityResult)>, ScoringError> {
        validate_profile(subject, ProfileRole::Subject)?;

        let eligible: Vec<&PetProfile> = candidates
            .iter()
            .filter(|candidate| subject.id.is_empty() || candidate.id != subject.id)
            .filter(|candidate| match filters {
                Some(filters) => {
                    let distance =
                        distance_between(subject.location.as_ref(), candidate.location.as_ref());
                    matches_filters(candidate, filters, distance)
                }
                None => true,
            })
            .collect();

        let score = |candidate: &&'a PetProfile| {
            self.compute_compatibility(subject, candidate)
                .map(|result| (*candidate, result))
        };

        let mut ranked: Vec<(&PetProfile, CompatibilityResult)> =
            if eligible.len() >= self.parallel_threshold {
                eligible.par_iter().map(score).collect::<Result<_, _>>()?
            } else {
                eligible.iter().map(score).collect::<Result<_, _>>()?
            };

        ranked.sort_by(|(_, a), (_, b)| ranking_order(&a.rank_key(), &b.rank_key()));

        tracing::debug!(
            "Ranked {} of {} candidates for pet {}",
            ranked.len(),
            candidates.len(),
            subject.id
        );

        Ok(ranked)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

fn build_playdate_match(
    subject: &PetProfile,
    candidate: &PetProfile,
    result: CompatibilityResult,
) -> PlaydateMatch {
    PlaydateMatch {
        id: format!("{}-{}", subject.id, candidate.id),
        pet1: subject.clone(),
        pet2: candidate.clone(),
        compatibility_score: result.score,
        compatibility_factors: result.factors,
        recommended_activities: recommended_activities(subject, candidate),
        safety_notes: safety_notes(result.factors.total()),
        distance_km: result.distance_km.map(reported_distance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, Intent, PetSize, Species};

    fn create_candidate(id: &str, name: &str, species: Species, age: f64, lat: f64, lon: f64) -> PetProfile {
        PetProfile {
            id: id.to_string(),
            name: name.to_string(),
            species: Some(species),
            intent: Some(Intent::Playdate),
            size: Some(PetSize::Medium),
            age: Some(age),
            personality_tags: vec!["friendly".to_string()],
            location: Some(GeoPoint::new(lat, lon)),
            ..Default::default()
        }
    }

    fn create_subject() -> PetProfile {
        create_candidate("subject", "Rex", Species::Dog, 3.0, 40.7128, -74.0060)
    }

    #[test]
    fn test_rank_sorted_by_score() {
        let subject = create_subject();
        let candidates = vec![
            create_candidate("cat", "Tom", Species::Cat, 3.0, 40.72, -74.01),
            create_candidate("dog", "Fido", Species::Dog, 3.0, 40.72, -74.01),
        ];

        let results = rank_candidates(&subject, &candidates, None).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].candidate_id, "dog");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_equal_scores_ranked_by_distance() {
        let subject = create_subject();
        // Same score, ~3.1km and ~1.4km north of the subject
        let candidates = vec![
            create_candidate("far", "Aaron", Species::Dog, 3.0, 40.7407, -74.0060),
            create_candidate("near", "Zed", Species::Dog, 3.0, 40.7254, -74.0060),
        ];

        let results = rank_candidates(&subject, &candidates, None).unwrap();

        assert_eq!(results[0].score, results[1].score);
        assert_eq!(results[0].candidate_id, "near");
        assert!(results[0].distance_km.unwrap() < results[1].distance_km.unwrap());
    }

    #[test]
    fn test_equal_score_and_distance_ranked_by_name() {
        let subject = create_subject();
        let candidates = vec![
            create_candidate("2", "Milo", Species::Dog, 3.0, 40.72, -74.01),
            create_candidate("1", "Bella", Species::Dog, 3.0, 40.72, -74.01),
        ];

        let results = rank_candidates(&subject, &candidates, None).unwrap();
        assert_eq!(results[0].candidate_name, "Bella");
    }

    #[test]
    fn test_subject_is_excluded() {
        let subject = create_subject();
        let candidates = vec![subject.clone(), create_candidate("1", "Bella", Species::Dog, 3.0, 40.72, -74.01)];

        let results = rank_candidates(&subject, &candidates, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].candidate_id, "1");
    }

    #[test]
    fn test_filtered_candidates_are_not_scored() {
        let subject = create_subject();
        let mut broken = create_candidate("broken", "Ghost", Species::Cat, 3.0, 40.72, -74.01);
        broken.size = None;
        let candidates = vec![broken, create_candidate("1", "Bella", Species::Dog, 3.0, 40.72, -74.01)];

        let filters = PetFilters {
            species: Some("dog".to_string()),
            ..Default::default()
        };

        // The invalid cat is excluded by the species filter before scoring
        let results = rank_candidates(&subject, &candidates, Some(&filters)).unwrap();
        assert_eq!(results.len(), 1);

        assert!(rank_candidates(&subject, &candidates, None).is_err());
    }

    #[test]
    fn test_distance_filtering() {
        let subject = create_subject();
        let candidates = vec![
            create_candidate("1", "Near", Species::Dog, 3.0, 40.72, -74.01),  // ~1km away
            create_candidate("2", "Mid", Species::Dog, 3.0, 41.5, -74.0),     // ~90km away
            create_candidate("3", "Far", Species::Dog, 3.0, 45.0, -74.0),     // >400km away
        ];
        let filters = PetFilters {
            max_distance: Some(50.0),
            ..Default::default()
        };

        let results = rank_candidates(&subject, &candidates, Some(&filters)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].candidate_id, "1");
    }

    #[test]
    fn test_invalid_subject_fails() {
        let mut subject = create_subject();
        subject.species = None;

        let err = rank_candidates(&subject, &[], None).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidProfile { role: ProfileRole::Subject, .. }));
    }

    #[test]
    fn test_ranking_is_stable_across_calls() {
        let subject = create_subject();
        let candidates: Vec<PetProfile> = (0..40)
            .map(|i| {
                create_candidate(
                    &i.to_string(),
                    &format!("Pet {}", i % 7),
                    if i % 3 == 0 { Species::Cat } else { Species::Dog },
                    1.0 + (i % 5) as f64,
                    40.72 + (i % 4) as f64 * 0.01,
                    -74.01,
                )
            })
            .collect();

        let first = rank_candidates(&subject, &candidates, None).unwrap();
        let second = rank_candidates(&subject, &candidates, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let subject = create_subject();
        let candidates: Vec<PetProfile> = (0..300)
            .map(|i| {
                create_candidate(
                    &format!("{:03}", i),
                    &format!("Pet {}", i % 11),
                    Species::Dog,
                    (i % 12) as f64,
                    40.70 + (i % 9) as f64 * 0.005,
                    -74.0,
                )
            })
            .collect();

        let sequential = Matcher::default().with_parallel_threshold(usize::MAX);
        let parallel = Matcher::default().with_parallel_threshold(1);

        assert_eq!(
            sequential.rank_candidates(&subject, &candidates, None).unwrap(),
            parallel.rank_candidates(&subject, &candidates, None).unwrap()
        );
    }

    #[test]
    fn test_find_playdate_matches_respects_limit() {
        let subject = create_subject();
        let candidates: Vec<PetProfile> = (0..20)
            .map(|i| create_candidate(&i.to_string(), "Pal", Species::Dog, 3.0, 40.72, -74.01))
            .collect();

        let result = Matcher::default()
            .find_playdate_matches(&subject, &candidates, None, DEFAULT_MAX_RESULTS)
            .unwrap();

        assert_eq!(result.matches.len(), 10);
        assert_eq!(result.total_candidates, 20);

        let first = &result.matches[0];
        assert_eq!(first.id, format!("subject-{}", first.pet2.id));
        assert_eq!(first.pet1.id, "subject");
        assert!(first.safety_notes.is_empty());
        assert_eq!(first.recommended_activities.len(), 3);
        let distance = first.distance_km.unwrap();
        assert_eq!(distance, (distance * 10.0).round() / 10.0);
    }

    #[test]
    fn test_low_score_gets_safety_notes() {
        let subject = create_subject();
        let mut candidate = create_candidate("1", "Whiskers", Species::Cat, 12.0, 40.72, -74.01);
        candidate.intent = Some(Intent::Adoption);

        let result = Matcher::default()
            .find_playdate_matches(&subject, &[candidate], None, DEFAULT_MAX_RESULTS)
            .unwrap();

        assert!(result.matches[0].compatibility_score < 70);
        assert_eq!(result.matches[0].safety_notes.len(), 2);
    }

    #[test]
    fn test_safety_notes_use_unrounded_score() {
        let subject = create_subject();
        // 25 intent + 15 size + 15 tags + 14.55 age = 69.55, reported as 70
        let candidate = create_candidate("1", "Whiskers", Species::Cat, 3.3, 40.72, -74.01);

        let result = Matcher::default()
            .find_playdate_matches(&subject, &[candidate], None, DEFAULT_MAX_RESULTS)
            .unwrap();

        assert_eq!(result.matches[0].compatibility_score, 70);
        assert_eq!(result.matches[0].safety_notes.len(), 2);
    }

    #[test]
    fn test_client_sort_keeps_order_within_reported_distance() {
        let subject = PetProfile {
            location: Some(GeoPoint::new(0.0, 0.0)),
            ..create_subject()
        };
        // Same score; ~1.41 km and ~1.44 km both report as 1.4 km
        let candidates = vec![
            create_candidate("z", "Zed", Species::Dog, 3.0, 0.01268, 0.0),
            create_candidate("a", "Amy", Species::Dog, 3.0, 0.01295, 0.0),
        ];

        let server = Matcher::default()
            .find_playdate_matches(&subject, &candidates, None, 10)
            .unwrap()
            .matches;
        assert_eq!(server[0].distance_km, server[1].distance_km);

        let mut client = server.clone();
        sort_recommendations(&mut client);
        assert_eq!(client, server);

        let ids: Vec<&str> = server.iter().map(|m| m.pet2.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "z"]);

        let ranked = rank_candidates(&subject, &candidates, None).unwrap();
        assert_eq!(ranked[0].candidate_id, "a");
    }

    #[test]
    fn test_sort_recommendations_matches_server_order() {
        let subject = create_subject();
        let candidates = vec![
            create_candidate("a", "Alpha", Species::Cat, 3.0, 40.72, -74.01),
            create_candidate("b", "Bravo", Species::Dog, 3.0, 40.75, -74.01),
            create_candidate("c", "Charlie", Species::Dog, 3.0, 40.72, -74.01),
        ];

        let ranked = Matcher::default()
            .find_playdate_matches(&subject, &candidates, None, 10)
            .unwrap()
            .matches;

        let mut shuffled: Vec<PlaydateMatch> = ranked.iter().rev().cloned().collect();
        sort_recommendations(&mut shuffled);

        let ids: Vec<&str> = shuffled.iter().map(|m| m.pet2.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }
}
