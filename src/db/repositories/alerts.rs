use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    helpers::{parse_datetime, to_i64},
    Database,
};
use crate::models::Alert;
use crate::providers::AlertSink;

/// An alert as stored, with its row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: String,
    pub alert: Alert,
}

impl Database {
    pub async fn insert_alert(&self, alert: &Alert) -> Result<String> {
        let record = alert.clone();
        let id = Uuid::new_v4().to_string();
        let row_id = id.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO alerts (id, cluster_id, headline, emitted_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    row_id,
                    record.cluster_id,
                    record.headline,
                    record.emitted_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert alert")?;
            Ok(())
        })
        .await?;
        Ok(id)
    }

    /// Most recent alerts first, optionally for one investigation only.
    pub async fn list_alerts(&self, cluster_id: Option<&str>, limit: usize) -> Result<Vec<AlertRecord>> {
        let cluster_id = cluster_id.map(str::to_string);
        let limit = to_i64(limit)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, cluster_id, headline, emitted_at
                 FROM alerts
                 WHERE ?1 IS NULL OR cluster_id = ?1
                 ORDER BY emitted_at DESC, rowid DESC
                 LIMIT ?2",
            )?;

            let mut rows = stmt.query(params![cluster_id, limit])?;
            let mut alerts = Vec::new();
            while let Some(row) = rows.next()? {
                alerts.push(AlertRecord {
                    id: row.get(0)?,
                    alert: Alert {
                        cluster_id: row.get(1)?,
                        headline: row.get(2)?,
                        emitted_at: parse_datetime(&row.get::<_, String>(3)?, "alerts.emitted_at")?,
                    },
                });
            }
            Ok(alerts)
        })
        .await
    }
}

#[async_trait]
impl AlertSink for Database {
    async fn emit(&self, alert: &Alert) -> Result<()> {
        self.insert_alert(alert).await.map(|_| ())
    }
}
