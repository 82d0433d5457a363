//! Care event entity and its invariants.

mod repository;

pub use repository::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

const MIN_NAME_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 100;
const MIN_NOTES_LENGTH: usize = 3;
const MAX_NOTES_LENGTH: usize = 1000;

/// Care event as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
#[serde(rename_all = "camelCase")]
pub struct Care {
    pub id: i64,
    pub plant_id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub last_care: DateTime<Utc>,
    pub next_care: DateTime<Utc>,
    pub name: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate(
    name: &str,
    notes: &str,
    last_care: DateTime<Utc>,
    next_care: DateTime<Utc>,
) -> Result<()> {
    if name.len() < MIN_NAME_LENGTH || name.len() > MAX_NAME_LENGTH {
        return Err(ServerError::InvalidCareName);
    }

    if notes.len() < MIN_NOTES_LENGTH || notes.len() > MAX_NOTES_LENGTH {
        return Err(ServerError::InvalidCareNotes);
    }

    // Equal timestamps are valid, only a strictly later last care is not.
    if last_care > next_care {
        return Err(ServerError::InvalidCareDate);
    }

    Ok(())
}

impl Care {
    /// Create a new [`Care`], with the last care defaulting to now.
    pub fn new(
        plant_id: i64,
        user_id: i64,
        next_care: DateTime<Utc>,
        name: impl Into<String>,
        notes: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let notes = notes.into();
        let last_care = Utc::now();

        validate(&name, &notes, last_care, next_care)?;

        let now = Utc::now();
        Ok(Self {
            id: 0,
            plant_id,
            user_id,
            last_care,
            next_care,
            name,
            notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the mutable fields, re-checking every invariant.
    ///
    /// Nothing is assigned unless all fields pass.
    pub fn update(
        &mut self,
        plant_id: i64,
        user_id: i64,
        last_care: DateTime<Utc>,
        next_care: DateTime<Utc>,
        name: impl Into<String>,
        notes: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        let notes = notes.into();

        validate(&name, &notes, last_care, next_care)?;

        self.plant_id = plant_id;
        self.user_id = user_id;
        self.last_care = last_care;
        self.next_care = next_care;
        self.name = name;
        self.notes = notes;
        self.updated_at = Utc::now();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn care() -> Care {
        Care::new(1, 1, Utc::now() + Duration::days(7), "Watering", "500ml")
            .unwrap()
    }

    #[test]
    fn test_new_care_rejects_past_next_care() {
        let err = Care::new(1, 1, Utc::now() - Duration::days(1), "Watering", "500ml")
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidCareDate));
    }

    #[test]
    fn test_update_rejects_last_care_after_next_care() {
        let mut care = care();
        let now = Utc::now();

        let err = care
            .update(1, 1, now + Duration::hours(1), now, "Watering", "500ml")
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidCareDate));
    }

    #[test]
    fn test_update_accepts_equal_timestamps() {
        let mut care = care();
        let now = Utc::now();

        care.update(1, 1, now, now, "Watering", "500ml").unwrap();
        assert_eq!(care.last_care, care.next_care);
    }

    #[test]
    fn test_name_and_notes_bounds() {
        let next = Utc::now() + Duration::days(7);

        assert!(matches!(
            Care::new(1, 1, next, "ab", "500ml").unwrap_err(),
            ServerError::InvalidCareName
        ));
        assert!(matches!(
            Care::new(1, 1, next, "Watering", "ab").unwrap_err(),
            ServerError::InvalidCareNotes
        ));
        assert!(matches!(
            Care::new(1, 1, next, "Watering", "a".repeat(1001)).unwrap_err(),
            ServerError::InvalidCareNotes
        ));
        assert!(Care::new(1, 1, next, "Watering", "a".repeat(1000)).is_ok());
    }

    #[test]
    fn test_failed_update_applies_nothing() {
        let mut care = care();
        let snapshot = care.clone();

        let err = care
            .update(2, 2, care.last_care, care.next_care, "ab", "new notes")
            .unwrap_err();

        assert!(matches!(err, ServerError::InvalidCareName));
        assert_eq!(care, snapshot);
    }
}
