//! CLI E2E tests.
//!
//! Each test seeds a schedule file in a temp directory, invokes the CLI
//! via cargo run, and checks the JSON it prints. Event dates are placed
//! relative to the current day so the past-move rule behaves the same
//! whenever the suite runs.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Duration, Utc};
use liftplan_core::{
    CalendarEvent, DateRange, EventType, ResourceRequirement, SkillLevel, Worker, WorkerSkill,
};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "liftplan-cli", "--"])
        .args(args)
        .output()
        .expect("failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Whole-second timestamp `days` from today at the given hour.
fn at(days: i64, hour: u32) -> DateTime<Utc> {
    (Utc::now().date_naive() + Duration::days(days))
        .and_hms_opt(hour, 0, 0)
        .unwrap()
        .and_utc()
}

fn worker(id: i64, name: &str, skills: Vec<WorkerSkill>) -> Worker {
    Worker {
        id,
        name: name.to_string(),
        role: "crane_operator".to_string(),
        is_active: true,
        skills,
        max_daily_hours: None,
    }
}

fn task(id: &str, worker_id: i64, date: DateTime<Utc>, hours: f64) -> CalendarEvent {
    CalendarEvent::try_new(id, EventType::Task, format!("Task {id}"), date, None)
        .unwrap()
        .with_worker(worker_id)
        .with_requirement(ResourceRequirement {
            skill_type: None,
            certification_required: false,
            worker_count: 1,
            estimated_hours: Some(hours),
        })
}

fn seed(dir: &Path, events: &[CalendarEvent]) -> PathBuf {
    let start = Utc::now().date_naive() - Duration::days(14);
    let range = DateRange::new(start, start + Duration::days(74));
    let workers = vec![
        worker(
            7,
            "Lars Berg",
            vec![WorkerSkill {
                skill_type: "tower_crane".to_string(),
                level: SkillLevel::Advanced,
                certified: true,
                certification_expires: None,
            }],
        ),
        worker(8, "Jonas Holm", Vec::new()),
    ];
    let payload = serde_json::json!({
        "workers": workers,
        "events": events,
        "range": range,
    });
    let path = dir.join("schedule.json");
    std::fs::write(&path, serde_json::to_string_pretty(&payload).unwrap()).unwrap();
    path
}

#[test]
fn test_events_list_attaches_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed(
        dir.path(),
        &[task("a", 7, at(30, 8), 4.0), task("b", 7, at(30, 8), 5.0)],
    );
    let data = path.to_str().unwrap();

    let (stdout, _, code) = run_cli(&["events", "list", "--data", data]);
    assert_eq!(code, 0);
    let events: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let events = events.as_array().unwrap();
    assert_eq!(events.len(), 2);
    for event in events {
        assert!(!event["conflicts"].as_array().unwrap().is_empty());
    }
}

#[test]
fn test_conflicts_check_names_the_double_booking() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed(
        dir.path(),
        &[task("a", 7, at(30, 8), 5.0), task("b", 7, at(30, 8), 4.0)],
    );
    let data = path.to_str().unwrap();

    let (stdout, _, code) = run_cli(&["conflicts", "check", "a", "--data", data]);
    assert_eq!(code, 0);
    let conflicts: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(conflicts
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["conflictType"] == "DOUBLE_BOOKING" && c["conflictingEventId"] == "b"));
}

#[test]
fn test_moves_validate_rejects_the_past() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed(dir.path(), &[task("a", 7, at(30, 8), 4.0)]);
    let data = path.to_str().unwrap();
    let target = at(-10, 8).to_rfc3339();

    let (stdout, _, code) = run_cli(&["moves", "validate", "a", &target, "--data", data]);
    assert_eq!(code, 0);
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["isValid"], false);
    assert!(result["errors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e == "event cannot be moved into the past"));
}

#[test]
fn test_moves_apply_invalid_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed(dir.path(), &[task("a", 7, at(30, 8), 4.0)]);
    let data = path.to_str().unwrap();
    let target = at(-10, 8).to_rfc3339();

    let (_, stderr, code) = run_cli(&["moves", "apply", "a", &target, "--data", data]);
    assert!(code != 0);
    assert!(stderr.contains("move rejected"));
}

#[test]
fn test_moves_apply_write_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed(dir.path(), &[task("a", 7, at(30, 8), 4.0)]);
    let data = path.to_str().unwrap();
    let target = at(32, 8);

    let (stdout, _, code) = run_cli(&[
        "moves",
        "apply",
        "a",
        &target.to_rfc3339(),
        "--write",
        "--data",
        data,
    ]);
    assert_eq!(code, 0);
    let outcome: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(outcome["validation"]["isValid"], true);

    let (stdout, _, code) = run_cli(&["events", "list", "--data", data]);
    assert_eq!(code, 0);
    let events: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let date = events[0]["date"].as_str().unwrap();
    let parsed = DateTime::parse_from_rfc3339(date).unwrap().with_timezone(&Utc);
    assert_eq!(parsed, target);
}

#[test]
fn test_availability_matrix_covers_the_roster() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed(dir.path(), &[task("a", 7, at(30, 8), 4.0)]);
    let data = path.to_str().unwrap();

    let (stdout, _, code) = run_cli(&["availability", "matrix", "--data", data]);
    assert_eq!(code, 0);
    let matrix: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(matrix["rows"].as_array().unwrap().len(), 2);
}

#[test]
fn test_assign_suggest_ranks_the_skilled_worker_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed(dir.path(), &[task("t", 8, at(30, 8), 4.0)]);
    let data = path.to_str().unwrap();

    let (stdout, _, code) = run_cli(&[
        "assign",
        "suggest",
        "t",
        "--skill",
        "tower_crane",
        "--data",
        data,
    ]);
    assert_eq!(code, 0);
    let suggestions: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let suggestions = suggestions.as_array().unwrap();
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0]["worker"]["id"], 7);
}

#[test]
fn test_policy_file_turns_overload_into_a_hard_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = seed(
        dir.path(),
        &[task("a", 7, at(30, 8), 6.0), task("b", 7, at(31, 8), 6.0)],
    );
    let data = path.to_str().unwrap();
    let policy_path = dir.path().join("policy.toml");
    std::fs::write(&policy_path, "forbidOverload = true\n").unwrap();
    let policy = policy_path.to_str().unwrap();
    let target = at(30, 8).to_rfc3339();

    let (stdout, _, code) = run_cli(&[
        "moves", "validate", "b", &target, "--data", data, "--policy", policy,
    ]);
    assert_eq!(code, 0);
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["isValid"], false);
    assert!(result["errors"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e.as_str().unwrap().contains("past daily capacity")));
}
