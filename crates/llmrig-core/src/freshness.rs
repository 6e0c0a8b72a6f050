//! Freshness scoring and deprecation detection.
//!
//! Catalog entries carry loose timestamps under several names
//! (`lastUpdated`, `updatedAt`, `releaseDate`, `createdAt`). Age maps to a
//! base score through a fixed threshold table; deprecation markers in the
//! description force the score down hard regardless of age.
//!
//! | Age (days) | Score |
//! |------------|-------|
//! | <=30       | 100   |
//! | <=90       | 90    |
//! | <=180      | 75    |
//! | <=365      | 60    |
//! | <=540      | 40    |
//! | <=720      | 25    |
//! | older      | 10    |

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Score ceiling applied when deprecation markers are present.
const DEPRECATED_SCORE_CEILING: f64 = 15.0;

/// Age beyond which a model counts as stale (days).
const STALE_AGE_DAYS: i64 = 540;

/// Catalog index age beyond which the index itself counts as stale (days).
const INDEX_STALE_DAYS: i64 = 30;

/// Score assigned when no timestamp is known at all.
const UNKNOWN_AGE_SCORE: f64 = 50.0;

fn deprecation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)deprecated|obsolete|legacy|archived|replaced by|use \S+ instead")
            .expect("deprecation marker pattern is valid")
    })
}

/// Computed freshness state for a model variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreshnessInfo {
    pub last_updated_at: Option<DateTime<Utc>>,
    pub model_age_days: Option<i64>,
    /// Base freshness score in [0, 100].
    pub freshness_score: f64,
    pub is_stale: bool,
    pub is_deprecated: bool,
    pub index_age_days: Option<i64>,
    pub index_stale: bool,
}

impl Default for FreshnessInfo {
    fn default() -> Self {
        Self {
            last_updated_at: None,
            model_age_days: None,
            freshness_score: UNKNOWN_AGE_SCORE,
            is_stale: false,
            is_deprecated: false,
            index_age_days: None,
            index_stale: false,
        }
    }
}

impl FreshnessInfo {
    /// Compute freshness from a loose timestamp, descriptive text to scan
    /// for deprecation markers, and the catalog index age. `now` is supplied
    /// by the caller so the math is reproducible.
    pub fn compute(
        timestamp: Option<&str>,
        scan_text: &str,
        index_age_days: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        let last_updated_at = timestamp.and_then(parse_loose_timestamp);
        let model_age_days = last_updated_at.map(|t| (now - t).num_days().max(0));

        let base_score = match model_age_days {
            Some(age) if age <= 30 => 100.0,
            Some(age) if age <= 90 => 90.0,
            Some(age) if age <= 180 => 75.0,
            Some(age) if age <= 365 => 60.0,
            Some(age) if age <= 540 => 40.0,
            Some(age) if age <= 720 => 25.0,
            Some(_) => 10.0,
            None => UNKNOWN_AGE_SCORE,
        };

        let is_deprecated = deprecation_regex().is_match(scan_text);
        let freshness_score = if is_deprecated {
            base_score.min(DEPRECATED_SCORE_CEILING)
        } else {
            base_score
        };

        Self {
            last_updated_at,
            model_age_days,
            freshness_score,
            is_stale: model_age_days.is_some_and(|age| age > STALE_AGE_DAYS),
            is_deprecated,
            index_age_days,
            index_stale: index_age_days.is_some_and(|age| age > INDEX_STALE_DAYS),
        }
    }

    /// Additive adjustment the quality prior applies for freshness.
    pub fn quality_adjustment(&self) -> f64 {
        let mut adjustment = 0.0;

        if self.is_deprecated {
            adjustment -= 12.0;
        }
        match self.model_age_days {
            Some(age) if age > 720 => adjustment -= 8.0,
            Some(age) if age > 365 => adjustment -= 4.0,
            _ => {}
        }
        if self.is_stale {
            adjustment -= 3.0;
        }

        if self.freshness_score >= 90.0 {
            adjustment += 3.0;
        } else if self.freshness_score >= 75.0 {
            adjustment += 2.0;
        } else if self.freshness_score >= 60.0 {
            adjustment += 1.0;
        }
        if self.freshness_score <= 25.0 {
            adjustment -= 4.0;
        }

        adjustment
    }

    /// Candidate rationale clause, when freshness is worth mentioning.
    pub fn rationale_clause(&self) -> Option<&'static str> {
        if self.is_deprecated {
            Some("deprecated penalized")
        } else if self.is_stale {
            Some("stale penalized")
        } else if self.freshness_score >= 90.0 {
            Some("fresh release")
        } else {
            None
        }
    }
}

/// Parse a timestamp that may be RFC 3339, a bare date, or epoch
/// milliseconds.
fn parse_loose_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(millis) = trimmed.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    None
}
