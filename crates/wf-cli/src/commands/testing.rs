//! Fixtures shared by command tests.

use chrono::{DateTime, Utc};
use serde_json::json;
use wf_core::{EntityId, EventAttrs, EventId};
use wf_db::Database;

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

/// A seeded in-memory database with one person employed since 2025.
pub fn employed_worker() -> (Database, EntityId, EventId) {
    let mut db = Database::open_in_memory().unwrap();
    db.seed_catalog().unwrap();
    let worker = db
        .create_entity("person", json!({"name": "Ada"}).as_object().cloned().unwrap())
        .unwrap()
        .id;
    let job = db
        .create_employment(&worker, &EventAttrs::starting(at("2025-01-01T00:00:00Z")))
        .unwrap()
        .event
        .id;
    (db, worker, job)
}
