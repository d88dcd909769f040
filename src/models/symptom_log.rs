// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily symptom log models.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Individual symptom entry with severity.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SymptomItem {
    /// Name of the symptom
    #[validate(length(min = 1))]
    pub name: String,
    /// Severity rating (1-5)
    #[validate(range(min = 1, max = 5))]
    pub severity: u8,
    /// Optional notes for this specific symptom
    pub notes: Option<String>,
}

/// Symptom log stored in Firestore.
///
/// One log per user per calendar day; the store upserts by `(user_id, date)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomLog {
    /// Log ID (uuid, also used as document ID)
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    /// Calendar date in `YYYY-MM-DD` form
    pub date: String,
    /// Symptoms logged for the day
    pub symptoms: Vec<SymptomItem>,
    /// General notes for the day
    pub overall_notes: Option<String>,
    /// Record creation timestamp (RFC3339)
    pub created_at: String,
    /// Last update timestamp (RFC3339)
    pub updated_at: String,
}

/// Request body for creating/updating a log.
#[derive(Debug, Deserialize, Validate)]
pub struct SymptomLogInput {
    #[validate(custom(function = validate_log_date))]
    pub date: String,
    #[validate(nested)]
    #[serde(default)]
    pub symptoms: Vec<SymptomItem>,
    pub overall_notes: Option<String>,
}

/// Validate a `YYYY-MM-DD` calendar date.
pub fn validate_log_date(date: &str) -> Result<(), ValidationError> {
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ValidationError::new("date must be YYYY-MM-DD"))
}

/// API response model for a symptom log.
#[derive(Debug, Serialize)]
pub struct SymptomLogResponse {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub symptoms: Vec<SymptomItem>,
    pub overall_notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SymptomLog> for SymptomLogResponse {
    fn from(log: SymptomLog) -> Self {
        Self {
            id: log.id,
            user_id: log.user_id,
            date: log.date,
            symptoms: log.symptoms,
            overall_notes: log.overall_notes,
            created_at: log.created_at,
            updated_at: log.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_log_date() {
        assert!(validate_log_date("2024-01-15").is_ok());
        assert!(validate_log_date("2024-1-15").is_err());
        assert!(validate_log_date("2024-13-40").is_err());
        assert!(validate_log_date("not a date").is_err());
    }

    #[test]
    fn test_symptom_item_severity_bounds() {
        let item = SymptomItem {
            name: "Hot Flushes".to_string(),
            severity: 4,
            notes: None,
        };
        assert!(item.validate().is_ok());

        let too_high = SymptomItem {
            severity: 6,
            ..item.clone()
        };
        assert!(too_high.validate().is_err());

        let zero = SymptomItem {
            severity: 0,
            ..item
        };
        assert!(zero.validate().is_err());
    }
}
