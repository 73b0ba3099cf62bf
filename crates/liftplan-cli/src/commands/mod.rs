pub mod assign;
pub mod availability;
pub mod conflicts;
pub mod events;
pub mod moves;

use liftplan_core::{EventPriority, EventStatus, EventType};

/// Parse an event type argument, e.g. "task" or "WORK_PLAN".
pub fn parse_event_type(s: &str) -> Result<EventType, String> {
    match s.to_uppercase().as_str() {
        "LEAVE" => Ok(EventType::Leave),
        "PROJECT" => Ok(EventType::Project),
        "TASK" => Ok(EventType::Task),
        "MILESTONE" => Ok(EventType::Milestone),
        "RESOURCE" => Ok(EventType::Resource),
        "MAINTENANCE" => Ok(EventType::Maintenance),
        "DEADLINE" => Ok(EventType::Deadline),
        "WORK_PLAN" | "WORKPLAN" => Ok(EventType::WorkPlan),
        other => Err(format!("unknown event type '{other}'")),
    }
}

pub fn parse_priority(s: &str) -> Result<EventPriority, String> {
    match s.to_uppercase().as_str() {
        "LOW" => Ok(EventPriority::Low),
        "MEDIUM" => Ok(EventPriority::Medium),
        "HIGH" => Ok(EventPriority::High),
        "CRITICAL" => Ok(EventPriority::Critical),
        other => Err(format!("unknown priority '{other}'")),
    }
}

pub fn parse_status(s: &str) -> Result<EventStatus, String> {
    match s.to_uppercase().as_str() {
        "SCHEDULED" => Ok(EventStatus::Scheduled),
        "IN_PROGRESS" | "INPROGRESS" => Ok(EventStatus::InProgress),
        "COMPLETED" => Ok(EventStatus::Completed),
        "CANCELLED" => Ok(EventStatus::Cancelled),
        other => Err(format!("unknown status '{other}'")),
    }
}
