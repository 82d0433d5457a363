//! Plant entity and its invariants.

mod repository;

pub use repository::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

const MIN_NAME_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 100;
const MIN_LOCATION_LENGTH: usize = 3;
const MAX_LOCATION_LENGTH: usize = 100;
const MIN_CARE_FREQUENCY: i32 = 1;
const MAX_CARE_FREQUENCY: i32 = 365;

/// Plant as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: i64,
    pub name: String,
    pub acquisition_date: DateTime<Utc>,
    pub location: String,
    /// Days between two cares.
    pub care_frequency: i32,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate(name: &str, location: &str, care_frequency: i32) -> Result<()> {
    if name.len() < MIN_NAME_LENGTH || name.len() > MAX_NAME_LENGTH {
        return Err(ServerError::InvalidPlantName);
    }

    if location.len() < MIN_LOCATION_LENGTH
        || location.len() > MAX_LOCATION_LENGTH
    {
        return Err(ServerError::InvalidPlantLocation);
    }

    if !(MIN_CARE_FREQUENCY..=MAX_CARE_FREQUENCY).contains(&care_frequency) {
        return Err(ServerError::InvalidCareFrequency);
    }

    Ok(())
}

impl Plant {
    /// Create a new [`Plant`] owned by `user_id`.
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        acquisition_date: DateTime<Utc>,
        care_frequency: i32,
        user_id: i64,
    ) -> Result<Self> {
        let name = name.into();
        let location = location.into();

        validate(&name, &location, care_frequency)?;

        let now = Utc::now();
        Ok(Self {
            id: 0,
            name,
            acquisition_date,
            location,
            care_frequency,
            user_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the mutable fields, re-checking every invariant.
    ///
    /// Nothing is assigned unless all fields pass.
    pub fn update(
        &mut self,
        name: impl Into<String>,
        location: impl Into<String>,
        acquisition_date: DateTime<Utc>,
        care_frequency: i32,
    ) -> Result<()> {
        let name = name.into();
        let location = location.into();

        validate(&name, &location, care_frequency)?;

        self.name = name;
        self.location = location;
        self.acquisition_date = acquisition_date;
        self.care_frequency = care_frequency;
        self.updated_at = Utc::now();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant() -> Plant {
        Plant::new("Monstera", "living room", Utc::now(), 7, 1).unwrap()
    }

    #[test]
    fn test_care_frequency_bounds() {
        let date = Utc::now();

        assert!(Plant::new("Monstera", "shelf", date, 1, 1).is_ok());
        assert!(Plant::new("Monstera", "shelf", date, 365, 1).is_ok());

        assert!(matches!(
            Plant::new("Monstera", "shelf", date, 0, 1).unwrap_err(),
            ServerError::InvalidCareFrequency
        ));
        assert!(matches!(
            Plant::new("Monstera", "shelf", date, 366, 1).unwrap_err(),
            ServerError::InvalidCareFrequency
        ));
    }

    #[test]
    fn test_name_and_location_bounds() {
        let date = Utc::now();

        assert!(matches!(
            Plant::new("ab", "shelf", date, 7, 1).unwrap_err(),
            ServerError::InvalidPlantName
        ));
        assert!(matches!(
            Plant::new("a".repeat(101), "shelf", date, 7, 1).unwrap_err(),
            ServerError::InvalidPlantName
        ));
        assert!(matches!(
            Plant::new("Monstera", "ab", date, 7, 1).unwrap_err(),
            ServerError::InvalidPlantLocation
        ));
    }

    #[test]
    fn test_update_refreshes_updated_at() {
        let mut plant = plant();
        let before = plant.updated_at;

        plant
            .update("Ficus", "bedroom", plant.acquisition_date, 14)
            .unwrap();

        assert_eq!(plant.name, "Ficus");
        assert_eq!(plant.location, "bedroom");
        assert_eq!(plant.care_frequency, 14);
        assert!(plant.updated_at >= before);
    }

    #[test]
    fn test_failed_update_applies_nothing() {
        let mut plant = plant();
        let snapshot = plant.clone();

        let err = plant
            .update("Ficus", "bedroom", plant.acquisition_date, 0)
            .unwrap_err();

        assert!(matches!(err, ServerError::InvalidCareFrequency));
        assert_eq!(plant, snapshot);
    }
}
