use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Error returned when a string does not name a known enum variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Pet species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Dog,
    Cat,
    Bird,
    Rabbit,
    Other,
}

impl Species {
    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Dog => "dog",
            Species::Cat => "cat",
            Species::Bird => "bird",
            Species::Rabbit => "rabbit",
            Species::Other => "other",
        }
    }
}

impl FromStr for Species {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dog" => Ok(Species::Dog),
            "cat" => Ok(Species::Cat),
            "bird" => Ok(Species::Bird),
            "rabbit" => Ok(Species::Rabbit),
            "other" => Ok(Species::Other),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// What a pet's owner is looking for. `All` is the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Adoption,
    Playdate,
    Mating,
    All,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Adoption => "adoption",
            Intent::Playdate => "playdate",
            Intent::Mating => "mating",
            Intent::All => "all",
        }
    }

    /// Equal intents are compatible, and `All` is compatible with everything
    pub fn is_compatible_with(&self, other: &Intent) -> bool {
        self == other || *self == Intent::All || *other == Intent::All
    }
}

impl FromStr for Intent {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adoption" => Ok(Intent::Adoption),
            "playdate" => Ok(Intent::Playdate),
            "mating" => Ok(Intent::Mating),
            "all" => Ok(Intent::All),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Ordered size scale, tiny = 0 .. extra-large = 4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PetSize {
    Tiny,
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl PetSize {
    pub fn index(&self) -> u8 {
        match self {
            PetSize::Tiny => 0,
            PetSize::Small => 1,
            PetSize::Medium => 2,
            PetSize::Large => 3,
            PetSize::ExtraLarge => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PetSize::Tiny => "tiny",
            PetSize::Small => "small",
            PetSize::Medium => "medium",
            PetSize::Large => "large",
            PetSize::ExtraLarge => "extra-large",
        }
    }
}

impl FromStr for PetSize {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tiny" => Ok(PetSize::Tiny),
            "small" => Ok(PetSize::Small),
            "medium" => Ok(PetSize::Medium),
            "large" => Ok(PetSize::Large),
            "extra-large" | "extra_large" | "xlarge" => Ok(PetSize::ExtraLarge),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Self-reported disposition toward other animals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sociability {
    Shy,
    Neutral,
    Social,
    Friendly,
    VeryFriendly,
}

impl Sociability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sociability::Shy => "shy",
            Sociability::Neutral => "neutral",
            Sociability::Social => "social",
            Sociability::Friendly => "friendly",
            Sociability::VeryFriendly => "very-friendly",
        }
    }
}

impl FromStr for Sociability {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shy" => Ok(Sociability::Shy),
            "neutral" => Ok(Sociability::Neutral),
            "social" => Ok(Sociability::Social),
            "friendly" => Ok(Sociability::Friendly),
            "very-friendly" | "very_friendly" => Ok(Sociability::VeryFriendly),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// Deserialize an optional enum, mapping unknown or mistyped values to `None`
pub(crate) fn lenient_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok()))
}

/// Deserialize an energy level (1-5), accepting integers, integral floats
/// or the named levels low, medium and high
fn lenient_level<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Value> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|level| u8::try_from(level).ok()),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(2),
            "medium" | "moderate" => Some(3),
            "high" => Some(4),
            other => other.parse().ok(),
        },
        _ => None,
    }))
}

/// Geographic point. Serialized as a GeoJSON `Point` with `[lon, lat]` coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "GeoJsonPoint", into = "GeoJsonPoint")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type", default = "point_type")]
    kind: String,
    coordinates: [f64; 2],
}

fn point_type() -> String {
    "Point".to_string()
}

impl From<GeoJsonPoint> for GeoPoint {
    fn from(point: GeoJsonPoint) -> Self {
        let [longitude, latitude] = point.coordinates;
        Self { latitude, longitude }
    }
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: point_type(),
            coordinates: [point.longitude, point.latitude],
        }
    }
}

/// Pet profile with the fields that take part in scoring and filtering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetProfile {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "owner", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_enum")]
    pub species: Option<Species>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_enum")]
    pub intent: Option<Intent>,
    #[serde(default, deserialize_with = "lenient_enum")]
    pub size: Option<PetSize>,
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub personality_tags: Vec<String>,
    #[serde(default)]
    pub play_style: Vec<String>,
    #[serde(
        default,
        alias = "activityLevel",
        alias = "energyLevel",
        deserialize_with = "lenient_level",
        skip_serializing_if = "Option::is_none"
    )]
    pub energy: Option<u8>,
    #[serde(
        default,
        deserialize_with = "lenient_enum",
        skip_serializing_if = "Option::is_none"
    )]
    pub sociability: Option<Sociability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

/// Weighted contribution of each factor to a compatibility score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityFactors {
    pub species: f64,
    pub intent: f64,
    pub size: f64,
    pub age: f64,
    pub personality: f64,
}

impl CompatibilityFactors {
    pub fn total(&self) -> f64 {
        self.species + self.intent + self.size + self.age + self.personality
    }
}

/// Outcome of scoring one candidate against a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityResult {
    pub candidate_id: String,
    pub candidate_name: String,
    pub score: u8,
    pub reasons: Vec<String>,
    pub factors: CompatibilityFactors,
    pub distance_km: Option<f64>,
}

/// Hard filters applied before scoring. Any field that cannot be
/// interpreted is treated as no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub personality_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_ids: Vec<String>,
}

/// One item of a playdate-matches response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaydateMatch {
    pub id: String,
    pub pet1: PetProfile,
    pub pet2: PetProfile,
    pub compatibility_score: u8,
    pub compatibility_factors: CompatibilityFactors,
    pub recommended_activities: Vec<String>,
    pub safety_notes: Vec<String>,
    pub distance_km: Option<f64>,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Scoring weights, in points out of 100
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub species: f64,
    pub intent: f64,
    pub size: f64,
    pub age: f64,
    pub personality: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            species: 30.0,
            intent: 25.0,
            size: 15.0,
            age: 15.0,
            personality: 15.0,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.species + self.intent + self.size + self.age + self.personality
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_from_mongo_shape() {
        let profile: PetProfile = serde_json::from_value(json!({
            "_id": "64f1a",
            "name": "Biscuit",
            "species": "dog",
            "intent": "playdate",
            "size": "xlarge",
            "age": 3,
            "personalityTags": ["friendly"],
            "activityLevel": 4,
            "sociability": "very-friendly",
            "location": { "type": "Point", "coordinates": [-74.006, 40.7128] }
        }))
        .unwrap();

        assert_eq!(profile.id, "64f1a");
        assert_eq!(profile.size, Some(PetSize::ExtraLarge));
        assert_eq!(profile.age, Some(3.0));
        assert_eq!(profile.energy, Some(4));
        assert_eq!(profile.sociability, Some(Sociability::VeryFriendly));
        let location = profile.location.unwrap();
        assert_eq!(location.latitude, 40.7128);
        assert_eq!(location.longitude, -74.006);
    }

    #[test]
    fn test_named_energy_levels() {
        let level = |value: serde_json::Value| {
            serde_json::from_value::<PetProfile>(json!({ "id": "p1", "energyLevel": value }))
                .unwrap()
                .energy
        };

        assert_eq!(level(json!("low")), Some(2));
        assert_eq!(level(json!("Medium")), Some(3));
        assert_eq!(level(json!("high")), Some(4));
        assert_eq!(level(json!("5")), Some(5));
        assert_eq!(level(json!("frantic")), None);
    }

    #[test]
    fn test_unknown_enum_values_become_none() {
        let profile: PetProfile = serde_json::from_value(json!({
            "id": "p1",
            "species": "dragon",
            "intent": 7,
            "size": "gigantic"
        }))
        .unwrap();

        assert_eq!(profile.species, None);
        assert_eq!(profile.intent, None);
        assert_eq!(profile.size, None);
    }

    #[test]
    fn test_location_serializes_as_geojson() {
        let value = serde_json::to_value(GeoPoint::new(51.5, -0.12)).unwrap();
        assert_eq!(value, json!({ "type": "Point", "coordinates": [-0.12, 51.5] }));
    }

    #[test]
    fn test_size_order() {
        assert!(PetSize::Tiny < PetSize::ExtraLarge);
        assert_eq!(PetSize::ExtraLarge.index() - PetSize::Tiny.index(), 4);
        assert_eq!("extra_large".parse::<PetSize>().unwrap(), PetSize::ExtraLarge);
    }

    #[test]
    fn test_intent_wildcard() {
        assert!(Intent::All.is_compatible_with(&Intent::Mating));
        assert!(Intent::Adoption.is_compatible_with(&Intent::All));
        assert!(!Intent::Adoption.is_compatible_with(&Intent::Playdate));
    }

    #[test]
    fn test_default_weights_sum_to_hundred() {
        assert_eq!(ScoringWeights::default().sum(), 100.0);
    }
}
