use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::{Incident, IncidentPatch};
use crate::error::AppError;
use crate::normalize::timestamps::{format_db_timestamp, next_updated_at};
use crate::query::{Column, ListQuery, Pagination, SELECT_COLUMNS};
use crate::validate::{parse_new_incident, parse_patch};

/// One page of list results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncidentPage {
    pub data: Vec<Incident>,
    pub pagination: Pagination,
}

fn incident_from_row(row: &Row<'_>) -> rusqlite::Result<Incident> {
    Ok(Incident {
        id: row.get(0)?,
        title: row.get(1)?,
        service: row.get(2)?,
        severity: row.get(3)?,
        status: row.get(4)?,
        owner: row.get(5)?,
        summary: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn optional_text(v: &Option<String>) -> Value {
    match v {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

/// Column assignments for exactly the fields a patch carries, valued from the patched record.
fn patch_assignments(patch: &IncidentPatch, updated: &Incident) -> Vec<(Column, Value)> {
    let mut out = Vec::new();
    if patch.title.is_some() {
        out.push((Column::Title, Value::Text(updated.title.clone())));
    }
    if patch.service.is_some() {
        out.push((Column::Service, Value::Text(updated.service.clone())));
    }
    if patch.severity.is_some() {
        out.push((Column::Severity, Value::Text(updated.severity.as_str().to_string())));
    }
    if patch.status.is_some() {
        out.push((Column::Status, Value::Text(updated.status.as_str().to_string())));
    }
    if patch.owner.is_some() {
        out.push((Column::Owner, optional_text(&updated.owner)));
    }
    if patch.summary.is_some() {
        out.push((Column::Summary, optional_text(&updated.summary)));
    }
    out
}

pub fn find_incident(conn: &Connection, id: &str) -> Result<Option<Incident>, AppError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM incidents WHERE id = ?1"),
        [id],
        incident_from_row,
    )
    .optional()
    .map_err(|e| {
        AppError::storage("DB_QUERY_FAILED", "Failed to query incident").with_details(e.to_string())
    })
}

pub fn get_incident(conn: &Connection, id: &str) -> Result<Incident, AppError> {
    find_incident(conn, id)?.ok_or_else(|| AppError::not_found(id))
}

pub fn count_incidents(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))
        .map_err(|e| {
            AppError::storage("DB_QUERY_FAILED", "Failed to count incidents")
                .with_details(e.to_string())
        })
}

pub(crate) fn insert_incident(conn: &Connection, incident: &Incident) -> Result<(), AppError> {
    conn.execute(
        r#"
      INSERT INTO incidents (id, title, service, severity, status, owner, summary, created_at, updated_at)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
      "#,
        params![
            incident.id,
            incident.title,
            incident.service,
            incident.severity,
            incident.status,
            incident.owner,
            incident.summary,
            incident.created_at,
            incident.updated_at,
        ],
    )
    .map_err(|e| {
        AppError::storage("DB_INSERT_FAILED", "Failed to insert incident")
            .with_details(e.to_string())
    })?;
    Ok(())
}

/// Validate `payload` in create mode and persist a new incident stamped at `now`.
pub fn create_incident(
    conn: &Connection,
    payload: &Map<String, serde_json::Value>,
    now: OffsetDateTime,
) -> Result<Incident, AppError> {
    let new = parse_new_incident(payload)?;
    let incident = new.into_incident(Uuid::new_v4().to_string(), format_db_timestamp(now)?);

    insert_incident(conn, &incident)?;
    tracing::info!(id = %incident.id, severity = incident.severity.as_str(), "created incident");

    get_incident(conn, &incident.id)
}

/// Apply a partial update. Only supplied allow-listed fields and `updated_at` are written.
pub fn update_incident(
    conn: &Connection,
    id: &str,
    payload: &Map<String, serde_json::Value>,
    now: OffsetDateTime,
) -> Result<Incident, AppError> {
    let existing = get_incident(conn, id)?;
    let patch = parse_patch(payload)?;
    let updated_at = next_updated_at(&existing.updated_at, now)?;
    let updated = patch.apply(&existing, updated_at);

    let assignments = patch_assignments(&patch, &updated);
    let mut set: Vec<String> = assignments
        .iter()
        .map(|(col, _)| format!("{} = ?", col.as_sql()))
        .collect();
    set.push(format!("{} = ?", Column::UpdatedAt.as_sql()));

    let mut values: Vec<Value> = assignments.into_iter().map(|(_, v)| v).collect();
    values.push(Value::Text(updated.updated_at.clone()));
    values.push(Value::Text(id.to_string()));

    let sql = format!("UPDATE incidents SET {} WHERE id = ?", set.join(", "));
    let changed = conn.execute(&sql, params_from_iter(values)).map_err(|e| {
        AppError::storage("DB_UPDATE_FAILED", "Failed to update incident")
            .with_details(e.to_string())
    })?;
    if changed == 0 {
        return Err(AppError::not_found(id));
    }
    tracing::info!(id, fields = set.len() - 1, "updated incident");

    get_incident(conn, id)
}

/// Run the count and page queries for a normalized list request.
pub fn list_incidents(conn: &Connection, query: &ListQuery) -> Result<IncidentPage, AppError> {
    let statements = query.statements();
    tracing::debug!(
        count_sql = %statements.count_sql,
        select_sql = %statements.select_sql,
        "listing incidents"
    );

    let total: i64 = conn
        .query_row(
            &statements.count_sql,
            params_from_iter(statements.where_params.iter()),
            |row| row.get(0),
        )
        .map_err(|e| {
            AppError::storage("DB_QUERY_FAILED", "Failed to count incidents")
                .with_details(e.to_string())
        })?;

    let mut stmt = conn.prepare(&statements.select_sql).map_err(|e| {
        AppError::storage("DB_QUERY_FAILED", "Failed to prepare incidents query")
            .with_details(e.to_string())
    })?;

    let rows = stmt
        .query_map(params_from_iter(statements.select_params()), incident_from_row)
        .map_err(|e| {
            AppError::storage("DB_QUERY_FAILED", "Failed to query incidents")
                .with_details(e.to_string())
        })?;

    let mut data = Vec::new();
    for r in rows {
        data.push(r.map_err(|e| {
            AppError::storage("DB_QUERY_FAILED", "Failed to decode incident row")
                .with_details(e.to_string())
        })?);
    }

    Ok(IncidentPage {
        data,
        pagination: Pagination::new(query.page, query.limit, total),
    })
}
