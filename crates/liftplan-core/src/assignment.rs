//! Ranked worker suggestions for staffing an event.
//!
//! Scoring weighs skill coverage (0.5), free capacity over the event's
//! window (0.3) and conflict-freedom of the hypothetical assignment (0.2).
//! A suggestion is optimal when it scores at least 0.8 with no conflicts,
//! which is the bar assignment UIs use for one-click staffing.

use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityAggregator;
use crate::calendar::CalendarEvent;
use crate::conflict::{ConflictDetector, ConflictInfo, ConflictSeverity};
use crate::error::{CoreError, Result};
use crate::policy::CapacityPolicy;
use crate::roster::{SkillLevel, Worker};

/// How one worker measures against one required skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMatch {
    pub required_skill: String,
    /// The worker's level, when they hold the skill at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_level: Option<SkillLevel>,
    pub is_match: bool,
    pub is_certified: bool,
}

/// One ranked staffing suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSuggestion {
    pub worker: Worker,
    /// Weighted score in 0.0..=1.0
    pub match_score: f64,
    /// Free capacity hours over the event's window
    pub available_hours: f64,
    pub skill_matches: Vec<SkillMatch>,
    /// Conflicts the assignment would create
    pub conflicts: Vec<ConflictInfo>,
}

impl AssignmentSuggestion {
    /// Good enough to assign without further review.
    pub fn is_optimal(&self) -> bool {
        self.match_score >= 0.8 && self.conflicts.is_empty()
    }
}

/// Produces ranked assignment suggestions under a capacity policy.
#[derive(Debug, Clone, Default)]
pub struct AssignmentAdvisor {
    policy: CapacityPolicy,
}

impl AssignmentAdvisor {
    pub fn new(policy: CapacityPolicy) -> Self {
        Self { policy }
    }

    /// Rank every active worker for the given event, best first.
    ///
    /// # Returns
    /// Suggestions sorted by descending score, worker id breaking ties.
    pub fn suggest(
        &self,
        workers: &[Worker],
        events: &[CalendarEvent],
        event_id: &str,
    ) -> Result<Vec<AssignmentSuggestion>> {
        let event = events
            .iter()
            .find(|e| e.id == event_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "event",
                id: event_id.to_string(),
            })?;
        let window = event.range();
        let aggregator = AvailabilityAggregator::new(self.policy.clone());
        let matrix = aggregator.compute(workers, events, window)?;
        let detector = ConflictDetector::new(self.policy.clone());

        let mut suggestions = Vec::new();
        for worker in workers.iter().filter(|w| w.is_active) {
            let skill_matches = score_skills(worker, event);
            let skill_score = if skill_matches.is_empty() {
                1.0
            } else {
                let hits = skill_matches
                    .iter()
                    .filter(|m| m.is_match && (m.is_certified || !certification_needed(event, m)))
                    .count();
                hits as f64 / skill_matches.len() as f64
            };

            let (available_hours, capacity_hours) = free_capacity(&matrix, worker.id);
            let availability_score = if capacity_hours <= 0.0 {
                0.0
            } else {
                (available_hours / capacity_hours).clamp(0.0, 1.0)
            };

            let hypothetical = reassign(events, event_id, worker.id);
            let conflicts = detector
                .detect_in_range(workers, &hypothetical, window)?
                .remove(event_id)
                .unwrap_or_default();
            let conflict_score = if conflicts.is_empty() {
                1.0
            } else if conflicts
                .iter()
                .any(|c| c.severity == ConflictSeverity::Critical)
            {
                0.0
            } else {
                0.5
            };

            let match_score =
                (0.5 * skill_score + 0.3 * availability_score + 0.2 * conflict_score)
                    .clamp(0.0, 1.0);

            suggestions.push(AssignmentSuggestion {
                worker: worker.clone(),
                match_score,
                available_hours,
                skill_matches,
                conflicts,
            });
        }

        suggestions.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.worker.id.cmp(&b.worker.id))
        });
        Ok(suggestions)
    }
}

fn score_skills(worker: &Worker, event: &CalendarEvent) -> Vec<SkillMatch> {
    let start = event.range().start;
    event
        .resource_requirements
        .iter()
        .filter_map(|requirement| requirement.skill_type.as_ref())
        .map(|required| {
            let held = worker.skill(required);
            SkillMatch {
                required_skill: required.clone(),
                worker_level: held.map(|s| s.level),
                is_match: held.is_some(),
                is_certified: held.map(|s| s.is_certification_valid(start)).unwrap_or(false),
            }
        })
        .collect()
}

fn certification_needed(event: &CalendarEvent, skill_match: &SkillMatch) -> bool {
    event.resource_requirements.iter().any(|r| {
        r.certification_required && r.skill_type.as_deref() == Some(&skill_match.required_skill)
    })
}

/// Free and total capacity hours over the matrix range for one worker.
fn free_capacity(matrix: &crate::availability::AvailabilityMatrix, worker_id: i64) -> (f64, f64) {
    let row = match matrix.row(worker_id) {
        Some(row) => row,
        None => return (0.0, 0.0),
    };
    let mut free = 0.0;
    let mut total = 0.0;
    for cell in row.daily.values() {
        total += cell.max_capacity_hours;
        if cell.leave.is_none() {
            free += (cell.max_capacity_hours - cell.assigned_hours).max(0.0);
        }
    }
    (free, total)
}

/// Clone the event set with the event reassigned to another worker.
fn reassign(events: &[CalendarEvent], event_id: &str, worker_id: i64) -> Vec<CalendarEvent> {
    events
        .iter()
        .map(|event| {
            if event.id == event_id {
                let mut assigned = event.clone();
                assigned.related.worker_id = Some(worker_id);
                assigned
            } else {
                event.clone()
            }
        })
        .collect()
}
