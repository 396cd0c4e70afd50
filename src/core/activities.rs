use crate::models::PetProfile;

/// Scores below this get the standard safety notes
pub const SAFETY_SCORE_THRESHOLD: f64 = 70.0;

const MAX_ACTIVITIES: usize = 3;

/// Coarse energy band derived from the 1-5 energy level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyBand {
    Low,
    Moderate,
    High,
}

impl EnergyBand {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 | 2 => Some(EnergyBand::Low),
            3 => Some(EnergyBand::Moderate),
            4 | 5 => Some(EnergyBand::High),
            _ => None,
        }
    }
}

fn energy_band(profile: &PetProfile) -> Option<EnergyBand> {
    profile.energy.and_then(EnergyBand::from_level)
}

fn breed_contains(profile: &PetProfile, needle: &str) -> bool {
    profile
        .breed
        .as_deref()
        .is_some_and(|breed| breed.to_lowercase().contains(needle))
}

/// Suggest up to three playdate activities for a pair of pets
///
/// Breed-specific activities come first, then activities for the pair's
/// combined energy level.
pub fn recommended_activities(subject: &PetProfile, candidate: &PetProfile) -> Vec<String> {
    let mut activities: Vec<&str> = Vec::with_capacity(5);

    if breed_contains(subject, "retriever") || breed_contains(candidate, "retriever") {
        activities.push("fetch");
    }
    if breed_contains(subject, "shepherd") || breed_contains(candidate, "shepherd") {
        activities.push("training games");
    }

    let by_energy: [&str; 3] = match (energy_band(subject), energy_band(candidate)) {
        (Some(EnergyBand::High), Some(EnergyBand::High)) => ["fetch", "run", "agility course"],
        (Some(EnergyBand::Low), Some(EnergyBand::Low)) => ["walk", "relaxed play", "socializing"],
        _ => ["walk", "light play", "exploration"],
    };

    for activity in by_energy {
        if !activities.contains(&activity) {
            activities.push(activity);
        }
    }

    activities
        .into_iter()
        .take(MAX_ACTIVITIES)
        .map(str::to_string)
        .collect()
}

/// Safety notes for a first meeting, based on the unrounded compatibility score
pub fn safety_notes(score: f64) -> Vec<String> {
    if score < SAFETY_SCORE_THRESHOLD {
        vec![
            "Monitor initial interactions".to_string(),
            "Keep on leash initially".to_string(),
        ]
    } else {
        Vec::new()
    }
}
