//! Per-phase structured run logs, uploaded to object storage once a phase
//! finishes.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectStorePath;
use object_store::{ObjectStore, ObjectStoreExt};
use serde::Serialize;
use tracing::info;

use crate::config::StorageConfig;
use crate::error::{AppError, Result};

/// Run-start timestamp used to key every object of one run, e.g. `2024-06-01_05-00-00`.
pub fn run_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// JSON-lines buffer of the events one phase produced.
#[derive(Debug, Default)]
pub struct PhaseLog {
    buf: Vec<u8>,
    events: usize,
}

impl PhaseLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `{"timestamp": .., "event": .., ...fields}` as one line.
    pub fn record<T: Serialize>(&mut self, event: &str, fields: &T) -> Result<()> {
        self.record_at(Utc::now(), event, fields)
    }

    pub fn record_at<T: Serialize>(
        &mut self,
        at: DateTime<Utc>,
        event: &str,
        fields: &T,
    ) -> Result<()> {
        let mut line = serde_json::Map::new();
        line.insert(
            "timestamp".to_string(),
            at.to_rfc3339_opts(SecondsFormat::Micros, true).into(),
        );
        line.insert("event".to_string(), event.into());
        match serde_json::to_value(fields)? {
            serde_json::Value::Object(map) => line.extend(map),
            serde_json::Value::Null => {}
            other => {
                return Err(AppError::Payload(format!(
                    "log event `{event}` fields must be an object, got {other}"
                )))
            }
        }

        serde_json::to_writer(&mut self.buf, &line)?;
        self.buf.push(b'\n');
        self.events += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// Uploads phase logs under `{run_timestamp}_{suffix}`.
pub struct LogShipper {
    store: Arc<dyn ObjectStore>,
    run_timestamp: String,
}

impl LogShipper {
    pub fn new(store: Arc<dyn ObjectStore>, run_timestamp: String) -> Self {
        Self { store, run_timestamp }
    }

    /// S3-compatible bucket from configuration.
    pub fn s3(cfg: &StorageConfig, run_timestamp: String) -> Result<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&cfg.bucket)
            .with_region(&cfg.region)
            .with_access_key_id(&cfg.access_key_id)
            .with_secret_access_key(&cfg.secret_access_key);
        if let Some(endpoint) = &cfg.endpoint_url {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        let store = builder.build()?;
        info!(bucket = %cfg.bucket, "Object store ready");
        Ok(Self::new(Arc::new(store), run_timestamp))
    }

    pub fn object_key(&self, suffix: &str) -> String {
        format!("{}_{}", self.run_timestamp, suffix)
    }

    /// Uploads the buffer and returns the object key it was written to.
    pub async fn ship(&self, suffix: &str, log: &PhaseLog) -> Result<String> {
        let key = self.object_key(suffix);
        let path = ObjectStorePath::from(key.as_str());
        if log.is_empty() {
            info!(%key, "Phase produced no events, uploading empty log");
        }
        self.store.put(&path, log.as_bytes().to_vec().into()).await?;
        info!(%key, events = log.len(), bytes = log.as_bytes().len(), "Uploaded phase log");
        Ok(key)
    }
}
