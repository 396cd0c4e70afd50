use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;
use thiserror::Error;

use crate::config::DatabaseSettings;
use crate::core::distance::{calculate_bounding_box, EARTH_RADIUS_KM};
use crate::models::{GeoPoint, PetFilters, PetProfile};

const PET_COLUMNS: &str = "id, owner_id, name, species, breed, gender, intent, size, age, \
     personality_tags, play_style, energy, sociability, latitude, longitude";

/// Errors that can occur when reading pet profiles
#[derive(Debug, Error)]
pub enum PetStoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// PostgreSQL-backed pet profile store
///
/// The store is the candidate source for playdate matching. Queries apply
/// cheap pre-filters (availability, owner, species, size, bounding box);
/// exact filtering and scoring happen in the matcher.
pub struct PetStore {
    pool: PgPool,
}

impl PetStore {
    /// Connect to PostgreSQL and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PetStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store from the database settings
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, PetStoreError> {
        tracing::info!(
            "Connecting to PostgreSQL (max: {} connections)",
            settings.max_connections.unwrap_or(10)
        );

        Self::new(
            &settings.url,
            settings.max_connections.unwrap_or(10),
            settings.min_connections.unwrap_or(1),
            Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(settings.idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Wrap an existing pool without running migrations
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a single pet by id
    pub async fn get_pet(&self, pet_id: &str) -> Result<PetProfile, PetStoreError> {
        let query = format!("SELECT {} FROM pets WHERE id = $1", PET_COLUMNS);

        let row = sqlx::query(&query)
            .bind(pet_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PetStoreError::NotFound(format!("Pet {} not found", pet_id)))?;

        Ok(pet_from_row(&row)?)
    }

    /// Load candidate pets for a subject
    ///
    /// Excludes the subject, other pets of the same owner and unavailable
    /// pets. Every hard filter that can be interpreted is applied in SQL
    /// before the limit, so the pool only holds pets that can match. Pets
    /// without a location are kept by the distance filter.
    pub async fn query_candidates(
        &self,
        subject: &PetProfile,
        filters: Option<&PetFilters>,
        limit: i64,
    ) -> Result<Vec<PetProfile>, PetStoreError> {
        let mut query = candidate_query(subject, filters, limit);

        let rows = query.build().fetch_all(&self.pool).await?;

        let pets = rows
            .iter()
            .map(pet_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Queried {} candidates for pet {}", pets.len(), subject.id);

        Ok(pets)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PetStoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

/// Build the candidate query for a subject
fn candidate_query(
    subject: &PetProfile,
    filters: Option<&PetFilters>,
    limit: i64,
) -> QueryBuilder<'static, Postgres> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {} FROM pets WHERE is_available = TRUE AND id <> ",
        PET_COLUMNS
    ));
    query.push_bind(subject.id.clone());

    if let Some(owner_id) = &subject.owner_id {
        query
            .push(" AND (owner_id IS NULL OR owner_id <> ")
            .push_bind(owner_id.clone())
            .push(")");
    }

    if let Some(filters) = filters {
        if let Some(species) = filters.species_constraint() {
            query.push(" AND species = ").push_bind(species.as_str());
        }

        if let Some(size) = filters.size_constraint() {
            query.push(" AND size = ").push_bind(size.as_str());
        }

        if let Some(intent) = filters.intent_constraint() {
            query
                .push(" AND lower(intent) IN (")
                .push_bind(intent.as_str())
                .push(", 'all')");
        }

        if let Some(breed) = filters.breed_constraint() {
            query
                .push(" AND lower(trim(breed)) = ")
                .push_bind(breed.to_lowercase());
        }

        if let Some(gender) = filters.gender_constraint() {
            query
                .push(" AND lower(trim(gender)) = ")
                .push_bind(gender.to_lowercase());
        }

        let (min_age, max_age) = filters.age_constraint();
        if let Some(min_age) = min_age {
            query.push(" AND age >= ").push_bind(min_age);
        }
        if let Some(max_age) = max_age {
            query.push(" AND age <= ").push_bind(max_age);
        }

        let tags = filters.required_tags();
        if !tags.is_empty() {
            query
                .push(" AND ARRAY(SELECT lower(trim(tag)) FROM unnest(personality_tags || play_style) AS tag) @> ")
                .push_bind(tags);
        }

        if !filters.exclude_ids.is_empty() {
            query
                .push(" AND NOT (id = ANY(")
                .push_bind(filters.exclude_ids.clone())
                .push("))");
        }

        if let (Some(max_distance), Some(location)) =
            (filters.distance_constraint(), subject.location)
        {
            push_distance_filter(&mut query, &location, max_distance);
        }
    }

    query.push(" ORDER BY id LIMIT ").push_bind(limit);
    query
}

/// Bounding box for the location index, then the exact haversine distance
fn push_distance_filter(query: &mut QueryBuilder<'_, Postgres>, center: &GeoPoint, radius_km: f64) {
    let bbox = calculate_bounding_box(center.latitude, center.longitude, radius_km);

    query
        .push(" AND (latitude IS NULL OR longitude IS NULL OR (latitude BETWEEN ")
        .push_bind(bbox.min_lat)
        .push(" AND ")
        .push_bind(bbox.max_lat);

    // Boxes crossing the antimeridian are left to the exact distance check
    if bbox.min_lon >= -180.0 && bbox.max_lon <= 180.0 {
        query
            .push(" AND longitude BETWEEN ")
            .push_bind(bbox.min_lon)
            .push(" AND ")
            .push_bind(bbox.max_lon);
    }

    query
        .push(format!(
            " AND {} * 2 * asin(least(1.0, sqrt(power(sin(radians(latitude - ",
            EARTH_RADIUS_KM
        ))
        .push_bind(center.latitude)
        .push(") / 2), 2) + cos(radians(")
        .push_bind(center.latitude)
        .push(")) * cos(radians(latitude)) * power(sin(radians(longitude - ")
        .push_bind(center.longitude)
        .push(") / 2), 2)))) <= ")
        .push_bind(radius_km)
        .push("))");
}

fn pet_from_row(row: &PgRow) -> Result<PetProfile, sqlx::Error> {
    let species: Option<String> = row.try_get("species")?;
    let intent: Option<String> = row.try_get("intent")?;
    let size: Option<String> = row.try_get("size")?;
    let sociability: Option<String> = row.try_get("sociability")?;
    let energy: Option<i16> = row.try_get("energy")?;
    let latitude: Option<f64> = row.try_get("latitude")?;
    let longitude: Option<f64> = row.try_get("longitude")?;

    Ok(PetProfile {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        owner_id: row.try_get("owner_id")?,
        species: species.as_deref().and_then(|s| s.parse().ok()),
        breed: row.try_get("breed")?,
        gender: row.try_get("gender")?,
        intent: intent.as_deref().and_then(|s| s.parse().ok()),
        size: size.as_deref().and_then(|s| s.parse().ok()),
        age: row.try_get("age")?,
        personality_tags: row.try_get("personality_tags")?,
        play_style: row.try_get("play_style")?,
        energy: energy.and_then(|e| u8::try_from(e).ok()),
        sociability: sociability.as_deref().and_then(|s| s.parse().ok()),
        location: match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
            _ => None,
        },
    })
}
