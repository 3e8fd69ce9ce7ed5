use rusqlite::Connection;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::{Incident, Severity, Status, KNOWN_SERVICES};
use crate::error::AppError;
use crate::normalize::timestamps::format_db_timestamp;
use crate::repo::insert_incident;

const TITLES: [&str; 30] = [
    "Login Failure",
    "Payment Delay",
    "API Timeout",
    "UI Bug on Dashboard",
    "Database Issue",
    "Memory Leak Detected",
    "SSL Certificate Expiry",
    "High Latency on Endpoint",
    "Service Unavailable",
    "Data Sync Failure",
    "Rate Limiting Triggered",
    "Deployment Rollback",
    "Cache Invalidation Error",
    "DNS Resolution Failure",
    "Disk Space Critical",
    "CPU Spike Alert",
    "Network Partition",
    "Authentication Token Expired",
    "Queue Backlog",
    "Replication Lag Detected",
    "Config Drift",
    "Health Check Failing",
    "Connection Pool Exhausted",
    "Deadlock Detected",
    "Schema Migration Failed",
    "Hot Partition Issue",
    "Cascading Failure",
    "Circuit Breaker Open",
    "Retry Storm",
    "Webhook Delivery Failure",
];

const SUMMARIES: [Option<&str>; 8] = [
    Some("Intermittent failures observed causing user-facing impact."),
    Some("Service degradation detected during peak traffic hours."),
    Some("Automated alerts triggered; investigation in progress."),
    Some("Rollback initiated after canary deployment showed elevated error rates."),
    Some("Partial outage affecting a subset of users in the EU region."),
    Some("Database connection pool saturation leading to request timeouts."),
    Some("Spike in 5xx errors correlated with recent code push."),
    None,
];

const OWNERS: [Option<&str>; 8] = [
    Some("jason@team.com"),
    Some("amy@team.com"),
    Some("dev@team.com"),
    Some("ops@team.com"),
    Some("sre@team.com"),
    Some("admin@team.com"),
    Some("lead@team.com"),
    None,
];

/// Spread of `created_at` values before `now`.
const WINDOW_SECS: i64 = 30 * 24 * 60 * 60;

fn demo_incident(i: usize, now: OffsetDateTime) -> Result<Incident, AppError> {
    // Co-prime strides keep the catalogs from lining up into obvious patterns.
    let n = i as i64;
    let age = (n * 7919) % WINDOW_SECS + 60;
    let created = now - Duration::seconds(age);
    let updated = created + Duration::seconds((n * 3571) % age);

    Ok(Incident {
        id: Uuid::new_v4().to_string(),
        title: TITLES[(i * 7) % TITLES.len()].to_string(),
        service: KNOWN_SERVICES[(i * 3) % KNOWN_SERVICES.len()].to_string(),
        severity: Severity::ALL[i % Severity::ALL.len()],
        status: Status::ALL[(i / 2) % Status::ALL.len()],
        owner: OWNERS[(i * 5) % OWNERS.len()].map(str::to_string),
        summary: SUMMARIES[(i * 3) % SUMMARIES.len()].map(str::to_string),
        created_at: format_db_timestamp(created)?,
        updated_at: format_db_timestamp(updated)?,
    })
}

/// Replace the table contents with `count` generated incidents, all timestamped before `now`.
pub fn seed_demo_dataset(
    conn: &mut Connection,
    count: usize,
    now: OffsetDateTime,
) -> Result<usize, AppError> {
    let tx = conn.transaction().map_err(|e| {
        AppError::storage("DB_TX_FAILED", "Failed to start seed transaction")
            .with_details(e.to_string())
    })?;

    tx.execute("DELETE FROM incidents", []).map_err(|e| {
        AppError::storage("DB_DELETE_FAILED", "Failed to clear incidents before seeding")
            .with_details(e.to_string())
    })?;

    for i in 0..count {
        insert_incident(&tx, &demo_incident(i, now)?)?;
    }

    tx.commit().map_err(|e| {
        AppError::storage("DB_TX_FAILED", "Failed to commit seed transaction")
            .with_details(e.to_string())
    })?;

    tracing::info!(count, "seeded demo incidents");
    Ok(count)
}
