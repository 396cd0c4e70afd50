use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::config::MatchingSettings;
use crate::core::{Matcher, ScoringError};
use crate::models::{
    CompatibilityRequest, ErrorResponse, HealthResponse, PetProfile, PlaydateMatchQuery,
    PlaydateMatchesResponse, RankRequest, RankResponse,
};
use crate::services::{CacheKey, CacheManager, PetStore, PetStoreError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PetStore>,
    /// Absent when Redis was unreachable at startup
    pub cache: Option<Arc<CacheManager>>,
    pub matcher: Matcher,
    pub matching: MatchingSettings,
}

/// Routes under `/api/pets`
pub fn configure_pets(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/{pet_id}/playdate-matches",
        web::get().to(playdate_matches),
    );
}

/// Routes under `/api/v1`
pub fn configure_scoring(cfg: &mut web::ServiceConfig) {
    cfg.route("/compatibility", web::post().to(compatibility))
        .route("/rank", web::post().to(rank));
}

fn error_response(status: actix_web::http::StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    error_response(
        actix_web::http::StatusCode::BAD_REQUEST,
        "Validation failed",
        errors.to_string(),
    )
}

fn invalid_profile(err: ScoringError) -> HttpResponse {
    error_response(
        actix_web::http::StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid profile",
        err.to_string(),
    )
}

/// Health check endpoint
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = state.store.health_check().await.unwrap_or(false);

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

async fn load_pet(state: &AppState, pet_id: &str) -> Result<PetProfile, PetStoreError> {
    let key = CacheKey::pet(pet_id);

    if let Some(cache) = &state.cache {
        if let Ok(pet) = cache.get::<PetProfile>(&key).await {
            return Ok(pet);
        }
    }

    let pet = state.store.get_pet(pet_id).await?;

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.set(&key, &pet).await {
            tracing::warn!("Failed to cache pet {}: {}", pet_id, e);
        }
    }

    Ok(pet)
}

/// Playdate matches for a pet
///
/// GET /api/pets/{petId}/playdate-matches?distance=10&size=medium&tags=friendly,calm
async fn playdate_matches(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PlaydateMatchQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_failed(errors);
    }

    let pet_id = path.into_inner();
    let filters = query.to_filters();
    let limit = query
        .limit
        .map(usize::from)
        .unwrap_or_else(|| state.matching.max_results())
        .min(state.matching.max_limit());

    tracing::info!("Finding playdate matches for pet: {}, limit: {}", pet_id, limit);

    let subject = match load_pet(&state, &pet_id).await {
        Ok(pet) => pet,
        Err(PetStoreError::NotFound(message)) => {
            return error_response(actix_web::http::StatusCode::NOT_FOUND, "Pet not found", message);
        }
        Err(e) => {
            tracing::error!("Failed to fetch pet {}: {}", pet_id, e);
            return error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to find matches",
                e.to_string(),
            );
        }
    };

    let cache_key = CacheKey::playdate_matches(&pet_id, &filters, limit);
    if let Some(cache) = &state.cache {
        if let Ok(cached) = cache.get::<PlaydateMatchesResponse>(&cache_key).await {
            tracing::debug!("Serving cached playdate matches for {}", pet_id);
            return HttpResponse::Ok().json(cached);
        }
    }

    let candidates = match state
        .store
        .query_candidates(&subject, Some(&filters), state.matching.candidate_pool())
        .await
    {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::error!("Failed to query candidates for {}: {}", pet_id, e);
            return error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to find matches",
                e.to_string(),
            );
        }
    };

    let result = match state
        .matcher
        .find_playdate_matches(&subject, &candidates, Some(&filters), limit)
    {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Cannot match pet {}: {}", pet_id, e);
            if let Some(cache) = &state.cache {
                if let Err(e) = cache.delete(&CacheKey::pet(&pet_id)).await {
                    tracing::warn!("Failed to invalidate cache: {}", e);
                }
            }
            return invalid_profile(e);
        }
    };

    let response = PlaydateMatchesResponse {
        success: true,
        data: result.matches,
        total_candidates: result.total_candidates,
    };

    tracing::info!(
        "Returning {} playdate matches for pet {} (from {} candidates)",
        response.data.len(),
        pet_id,
        response.total_candidates
    );

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.set(&cache_key, &response).await {
            tracing::warn!("Failed to cache playdate matches: {}", e);
        }
    }

    HttpResponse::Ok().json(response)
}

/// Score one candidate against a subject
///
/// POST /api/v1/compatibility
async fn compatibility(
    state: web::Data<AppState>,
    req: web::Json<CompatibilityRequest>,
) -> impl Responder {
    match state.matcher.compute_compatibility(&req.subject, &req.candidate) {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => invalid_profile(e),
    }
}

/// Filter, score and rank a candidate list
///
/// POST /api/v1/rank
///
/// Request body:
/// ```json
/// {
///   "subject": { "id": "p1", "species": "dog", "size": "medium", "age": 3 },
///   "candidates": [ ... ],
///   "filters": { "maxDistance": 10 },
///   "limit": 20
/// }
/// ```
async fn rank(state: web::Data<AppState>, req: web::Json<RankRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let total_candidates = req.candidates.len();

    let results = match state
        .matcher
        .rank_candidates(&req.subject, &req.candidates, req.filters.as_ref())
    {
        Ok(results) => results,
        Err(e) => return invalid_profile(e),
    };

    let results = match req.limit {
        Some(limit) => results.into_iter().take(usize::from(limit)).collect(),
        None => results,
    };

    HttpResponse::Ok().json(RankResponse {
        results,
        total_candidates,
    })
}
