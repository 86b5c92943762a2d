//! SQLite storage layer -- schema, queries, migrations.
//!
//! The store is the sole owner of incident identity: ids are assigned here
//! at append time, never by the pipeline.

pub mod schema;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use uuid::Uuid;

use crate::detect::{Incident, Severity};

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &str) -> Result<Pool> {
    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// A persisted incident, as read back from the store.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IncidentRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub values: BTreeMap<String, f64>,
    pub score: f64,
    pub is_anomaly: bool,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// Append an incident and return the id the store assigned to it.
pub fn append_incident(pool: &Pool, incident: &Incident) -> Result<Uuid> {
    let conn = pool.get()?;
    let id = Uuid::new_v4();
    let values_json =
        serde_json::to_string(&incident.values).context("failed to serialize incident values")?;

    conn.execute(
        "INSERT INTO incidents (id, timestamp, source, values_json, score, is_anomaly, severity, type, message)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            id.to_string(),
            incident.timestamp.to_rfc3339(),
            incident.source,
            values_json,
            incident.score,
            incident.is_anomaly as i64,
            incident.severity.as_str(),
            incident.kind,
            incident.message,
        ],
    )?;

    Ok(id)
}

/// Predicate set for incident queries. All fields optional and ANDed.
#[derive(Debug, Default, Clone)]
pub struct IncidentQuery {
    pub severity: Option<Severity>,
    pub source: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Query incidents newest-first with optional severity/source/time filters.
pub fn query_incidents(pool: &Pool, query: &IncidentQuery) -> Result<Vec<IncidentRecord>> {
    let conn = pool.get()?;

    let mut sql = String::from(
        "SELECT id, timestamp, source, values_json, score, is_anomaly, severity, type, message
         FROM incidents",
    );
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<String> = Vec::new();

    if let Some(sev) = query.severity {
        clauses.push("severity = ?");
        params.push(sev.as_str().to_string());
    }
    if let Some(source) = &query.source {
        clauses.push("source = ?");
        params.push(source.clone());
    }
    if let Some(since) = query.since {
        clauses.push("timestamp >= ?");
        params.push(since.to_rfc3339());
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC");
    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), row_to_record)?;

    let mut incidents = Vec::new();
    for r in rows {
        incidents.push(r?);
    }
    Ok(incidents)
}

/// Total number of stored incidents.
pub fn count_incidents(pool: &Pool) -> Result<i64> {
    let conn = pool.get()?;
    let count = conn.query_row("SELECT COUNT(*) FROM incidents", [], |row| row.get(0))?;
    Ok(count)
}

/// Number of incidents with a timestamp at or after `since`.
pub fn count_since(pool: &Pool, since: DateTime<Utc>) -> Result<i64> {
    let conn = pool.get()?;
    let count = conn.query_row(
        "SELECT COUNT(*) FROM incidents WHERE timestamp >= ?1",
        rusqlite::params![since.to_rfc3339()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Most recently appended incident, if any.
pub fn latest_incident(pool: &Pool) -> Result<Option<IncidentRecord>> {
    let mut rows = query_incidents(
        pool,
        &IncidentQuery {
            limit: Some(1),
            ..Default::default()
        },
    )?;
    Ok(rows.pop())
}

/// Delete every stored incident, returning how many were removed.
pub fn clear_incidents(pool: &Pool) -> Result<usize> {
    let conn = pool.get()?;
    let deleted = conn.execute("DELETE FROM incidents", [])?;
    Ok(deleted)
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<IncidentRecord> {
    let id_str: String = row.get(0)?;
    let ts_str: String = row.get(1)?;
    let values_str: String = row.get(3)?;
    let sev_str: String = row.get(6)?;

    Ok(IncidentRecord {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        timestamp: DateTime::parse_from_rfc3339(&ts_str)
            .unwrap_or_default()
            .with_timezone(&Utc),
        source: row.get(2)?,
        values: serde_json::from_str(&values_str).unwrap_or_default(),
        score: row.get(4)?,
        is_anomaly: row.get::<_, i64>(5)? != 0,
        severity: sev_str.parse().unwrap_or(Severity::Low),
        kind: row.get(7)?,
        message: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_pool() -> (tempfile::TempDir, Pool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("incidents.db");
        let pool = open_pool(path.to_str().unwrap()).unwrap();
        (dir, pool)
    }

    fn sample_incident(source: &str, severity: Severity, age: Duration) -> Incident {
        let mut values = BTreeMap::new();
        values.insert("amount".to_string(), 42.0);
        Incident {
            timestamp: Utc::now() - age,
            source: source.to_string(),
            values,
            score: -0.12,
            is_anomaly: true,
            severity,
            kind: "payment".to_string(),
            message: "Suspicious payment activity".to_string(),
        }
    }

    #[test]
    fn test_append_assigns_unique_ids() {
        let (_dir, pool) = test_pool();
        let a = append_incident(&pool, &sample_incident("s1", Severity::High, Duration::zero()))
            .unwrap();
        let b = append_incident(&pool, &sample_incident("s1", Severity::High, Duration::zero()))
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_round_trip() {
        let (_dir, pool) = test_pool();
        let incident = sample_incident("sensor-payment", Severity::High, Duration::zero());
        let id = append_incident(&pool, &incident).unwrap();

        let rows = query_incidents(&pool, &IncidentQuery::default()).unwrap();
        assert_eq!(rows.len(), 1);
        let rec = &rows[0];
        assert_eq!(rec.id, id);
        assert_eq!(rec.source, "sensor-payment");
        assert_eq!(rec.severity, Severity::High);
        assert_eq!(rec.kind, "payment");
        assert!(rec.is_anomaly);
        assert_eq!(rec.values.get("amount"), Some(&42.0));
    }

    #[test]
    fn test_query_filters() {
        let (_dir, pool) = test_pool();
        append_incident(&pool, &sample_incident("a", Severity::Low, Duration::hours(2))).unwrap();
        append_incident(&pool, &sample_incident("b", Severity::High, Duration::zero())).unwrap();
        append_incident(&pool, &sample_incident("b", Severity::Critical, Duration::zero()))
            .unwrap();

        let by_severity = query_incidents(
            &pool,
            &IncidentQuery {
                severity: Some(Severity::High),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_severity.len(), 1);

        let by_source = query_incidents(
            &pool,
            &IncidentQuery {
                source: Some("b".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_source.len(), 2);

        let recent = query_incidents(
            &pool,
            &IncidentQuery {
                since: Some(Utc::now() - Duration::hours(1)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(recent.len(), 2);

        let limited = query_incidents(
            &pool,
            &IncidentQuery {
                limit: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_counts_and_clear() {
        let (_dir, pool) = test_pool();
        append_incident(&pool, &sample_incident("a", Severity::Low, Duration::zero())).unwrap();
        append_incident(&pool, &sample_incident("a", Severity::Low, Duration::zero())).unwrap();

        assert_eq!(count_incidents(&pool).unwrap(), 2);
        assert!(latest_incident(&pool).unwrap().is_some());
        assert_eq!(clear_incidents(&pool).unwrap(), 2);
        assert_eq!(count_incidents(&pool).unwrap(), 0);
        assert!(latest_incident(&pool).unwrap().is_none());
    }
}
