use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::core::{filters::apply_filters, matcher::sort_recommendations};
use crate::models::{PetFilters, PlaydateMatch, PlaydateMatchesResponse};

/// Distance range the server accepts for the `distance` query parameter
const SERVER_DISTANCE_RANGE: std::ops::RangeInclusive<f64> = 1.0..=100.0;

/// Errors that can occur when talking to the matching backend
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Client-side recommendation service
///
/// Fetches playdate matches from the backend and re-applies the caller's
/// filters and ordering locally, so a filter change can be reflected
/// without another round-trip (see [`refine`]).
pub struct RecommendationClient {
    base_url: String,
    auth_token: Option<String>,
    client: Client,
}

impl RecommendationClient {
    /// Create a new client for the backend at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            auth_token: None,
            client,
        })
    }

    /// Send a bearer token with every request
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Fetch playdate matches in server order
    pub async fn fetch_playdate_matches(
        &self,
        pet_id: &str,
        filters: &PetFilters,
    ) -> Result<Vec<PlaydateMatch>, ClientError> {
        let url = format!(
            "{}/api/pets/{}/playdate-matches{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(pet_id),
            query_string(filters)
        );

        tracing::debug!("Fetching playdate matches from: {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(format!("Pet {} not found", pet_id)));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to fetch playdate matches for {}: {} - {}", pet_id, status, body);
            return Err(ClientError::ApiError(format!(
                "Failed to fetch playdate matches: {}",
                status
            )));
        }

        let json: Value = response.json().await?;

        if json.get("success").and_then(Value::as_bool) == Some(false) {
            let message = json
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(ClientError::ApiError(message.to_string()));
        }

        let parsed: PlaydateMatchesResponse = serde_json::from_value(json).map_err(|e| {
            ClientError::InvalidResponse(format!("Failed to parse playdate matches: {}", e))
        })?;

        Ok(parsed.data)
    }

    /// Fetch recommendations and run the local filter and sort pass
    pub async fn get_recommendations(
        &self,
        pet_id: &str,
        filters: &PetFilters,
    ) -> Result<Vec<PlaydateMatch>, ClientError> {
        let matches = self.fetch_playdate_matches(pet_id, filters).await?;
        let received = matches.len();
        let refined = refine(matches, filters);

        tracing::debug!(
            "Kept {} of {} recommendations for pet {}",
            refined.len(),
            received,
            pet_id
        );

        Ok(refined)
    }
}

/// Re-filter and re-sort matches that are already on the client
pub fn refine(matches: Vec<PlaydateMatch>, filters: &PetFilters) -> Vec<PlaydateMatch> {
    let mut kept = apply_filters(matches, filters);
    sort_recommendations(&mut kept);
    kept
}

/// Encode filters as the query string of the playdate-matches endpoint
///
/// Values the server would reject are left out; the local pass still
/// applies them.
pub fn query_string(filters: &PetFilters) -> String {
    let mut params: Vec<(&str, String)> = Vec::new();

    if let Some(distance) = filters
        .distance_constraint()
        .filter(|d| SERVER_DISTANCE_RANGE.contains(d))
    {
        params.push(("distance", distance.to_string()));
    }
    if let Some(size) = filters.size_constraint() {
        params.push(("size", size.as_str().to_string()));
    }
    if let Some(species) = filters.species_constraint() {
        params.push(("species", species.as_str().to_string()));
    }
    if let Some(intent) = filters.intent_constraint() {
        params.push(("intent", intent.as_str().to_string()));
    }
    if let Some(breed) = filters.breed_constraint() {
        params.push(("breed", breed.to_string()));
    }
    if let Some(gender) = filters.gender_constraint() {
        params.push(("gender", gender.to_string()));
    }
    let (min_age, max_age) = filters.age_constraint();
    if let Some(min_age) = min_age {
        params.push(("minAge", min_age.to_string()));
    }
    if let Some(max_age) = max_age {
        params.push(("maxAge", max_age.to_string()));
    }
    if !filters.personality_tags.is_empty() {
        params.push(("tags", filters.personality_tags.join(",")));
    }

    if params.is_empty() {
        return String::new();
    }

    let encoded: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect();

    format!("?{}", encoded.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompatibilityFactors, PetProfile};
    use serde_json::json;

    fn pet(id: &str, name: &str, species: &str) -> PetProfile {
        serde_json::from_value(json!({
            "id": id,
            "name": name,
            "species": species,
            "size": "medium",
            "age": 3
        }))
        .unwrap()
    }

    fn playdate(candidate: PetProfile, score: u8, distance_km: f64) -> PlaydateMatch {
        PlaydateMatch {
            id: format!("p1-{}", candidate.id),
            pet1: pet("p1", "Rex", "dog"),
            pet2: candidate,
            compatibility_score: score,
            compatibility_factors: CompatibilityFactors::default(),
            recommended_activities: vec!["walk".to_string()],
            safety_notes: vec![],
            distance_km: Some(distance_km),
        }
    }

    #[test]
    fn test_query_string() {
        let filters = PetFilters {
            max_distance: Some(10.0),
            species: Some("Dog".to_string()),
            breed: Some("Border Collie".to_string()),
            personality_tags: vec!["calm".to_string(), "shy".to_string()],
            ..Default::default()
        };

        assert_eq!(
            query_string(&filters),
            "?distance=10&species=dog&breed=Border%20Collie&tags=calm%2Cshy"
        );
        assert_eq!(query_string(&PetFilters::default()), "");
    }

    #[test]
    fn test_query_string_omits_distance_server_rejects() {
        let filters = PetFilters {
            max_distance: Some(0.5),
            ..Default::default()
        };
        assert_eq!(query_string(&filters), "");
    }

    #[test]
    fn test_refine_filters_and_sorts() {
        let matches = vec![
            playdate(pet("a", "Alpha", "dog"), 80, 1.0),
            playdate(pet("b", "Bravo", "cat"), 95, 1.0),
            playdate(pet("c", "Charlie", "dog"), 82, 3.1),
            playdate(pet("d", "Delta", "dog"), 82, 1.4),
        ];
        let filters = PetFilters {
            species: Some("dog".to_string()),
            ..Default::default()
        };

        let refined = refine(matches, &filters);
        let ids: Vec<&str> = refined.iter().map(|m| m.pet2.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c", "a"]);
    }

    #[tokio::test]
    async fn test_get_recommendations_refilters_server_response() {
        let mut server = mockito::Server::new_async().await;

        let body = json!({
            "success": true,
            "data": [
                playdate(pet("a", "Alpha", "dog"), 70, 9.0),
                playdate(pet("b", "Bravo", "dog"), 90, 2.0),
                playdate(pet("c", "Charlie", "dog"), 90, 1.0),
            ],
            "totalCandidates": 3
        });

        let mock = server
            .mock("GET", "/api/pets/p1/playdate-matches")
            .match_query(mockito::Matcher::UrlEncoded("distance".into(), "5".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = RecommendationClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let filters = PetFilters {
            max_distance: Some(5.0),
            ..Default::default()
        };

        let recommendations = client.get_recommendations("p1", &filters).await.unwrap();

        mock.assert_async().await;
        let ids: Vec<&str> = recommendations.iter().map(|m| m.pet2.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/pets/missing/playdate-matches")
            .with_status(404)
            .with_body(r#"{"success":false,"message":"Pet not found"}"#)
            .create_async()
            .await;

        let client = RecommendationClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = client
            .fetch_playdate_matches("missing", &PetFilters::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unsuccessful_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/pets/p1/playdate-matches")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":false,"message":"Failed to find matches"}"#)
            .create_async()
            .await;

        let client = RecommendationClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = client
            .fetch_playdate_matches("p1", &PetFilters::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::ApiError(message) if message == "Failed to find matches"));
    }
}
