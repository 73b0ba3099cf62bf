//! Worker roster: operators, their skills and certifications.
//!
//! The roster is the reference set every event's worker id must resolve
//! against. Capacity lookups and skill checks for conflict detection and
//! assignment suggestions live here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::policy::CapacityPolicy;

/// Proficiency level for a skill, ordered weakest to strongest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

/// A skill held by a worker, optionally backed by a certification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerSkill {
    /// Skill identifier, e.g. "mobile_crane" or "tower_crane"
    pub skill_type: String,
    /// Proficiency level
    pub level: SkillLevel,
    /// Whether the worker holds a certificate for this skill
    pub certified: bool,
    /// Expiry date of the certificate, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification_expires: Option<NaiveDate>,
}

impl WorkerSkill {
    /// Whether the certification is valid on the given date.
    ///
    /// A skill without an expiry date never expires; an uncertified skill
    /// is never valid.
    pub fn is_certification_valid(&self, on: NaiveDate) -> bool {
        if !self.certified {
            return false;
        }
        match self.certification_expires {
            Some(expires) => on <= expires,
            None => true,
        }
    }
}

/// A worker on the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    /// Stable numeric id, shared with event references
    pub id: i64,
    /// Full name as entered in the personnel system
    pub name: String,
    /// Role label, e.g. "crane_operator"
    pub role: String,
    /// Inactive workers are unavailable regardless of events
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Skills with certification state
    #[serde(default)]
    pub skills: Vec<WorkerSkill>,
    /// Per-day capacity override in hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_hours: Option<f64>,
}

fn default_active() -> bool {
    true
}

impl Worker {
    /// Short display name: the first two whitespace-separated name parts.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = self.name.split_whitespace().take(2).collect();
        parts.join(" ")
    }

    /// Daily capacity in hours, falling back to the policy default.
    pub fn capacity(&self, policy: &CapacityPolicy) -> f64 {
        self.max_daily_hours
            .unwrap_or(policy.default_daily_capacity_hours)
    }

    /// Look up a skill by type.
    pub fn skill(&self, skill_type: &str) -> Option<&WorkerSkill> {
        self.skills.iter().find(|s| s.skill_type == skill_type)
    }

    /// Whether the worker holds the skill at or above the given level.
    pub fn has_skill(&self, skill_type: &str, min_level: SkillLevel) -> bool {
        self.skill(skill_type)
            .map(|s| s.level >= min_level)
            .unwrap_or(false)
    }
}
