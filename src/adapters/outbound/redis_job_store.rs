//! Redis Job Store
//!
//! Implements JobStore on Redis: one hash per job plus a list used as the queue.
//!
//! ## Layout
//!
//! - **Job record**: `georest:job:<id>` hash with fields `status`, `request`
//!   (JSON), `result`, `error`, `created_at`, `started_at`, `ended_at`
//! - **Queue**: `georest:queue:<name>` list of job ids (LPUSH on submit, RPOP on claim)
//!
//! A claim pops the id and marks the record `started` in one Lua script, so a
//! failed round trip can never leave a popped job behind as `queued`.
//!
//! Records are never deleted here; expiry is left to Redis configuration.

use crate::domain::entities::{Job, LookupRequest};
use crate::domain::ports::{JobStore, StoreError};
use crate::domain::value_objects::JobStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::RedisResult;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Key namespace shared by every key this store writes.
const KEY_PREFIX: &str = "georest";

/// Pop the oldest id and start its job if it is still claimable.
///
/// KEYS[1] is the queue, ARGV[1] the job key prefix, ARGV[2] the start time.
/// Replies nil on an empty queue, otherwise `{id, tag, fields}` where `tag` is
/// `started` (fields hold the updated record), `missing`, or the status that
/// made the job unclaimable.
const CLAIM_SCRIPT: &str = r#"
local id = redis.call('RPOP', KEYS[1])
if not id then
    return false
end
local key = ARGV[1] .. id
local status = redis.call('HGET', key, 'status')
if not status then
    return {id, 'missing', {}}
end
if status ~= 'queued' and status ~= 'deferred' then
    return {id, status, {}}
end
redis.call('HSET', key, 'status', 'started', 'started_at', ARGV[2])
return {id, 'started', redis.call('HGETALL', key)}
"#;

type ClaimReply = Option<(String, String, HashMap<String, String>)>;

/// Redis-backed job store.
///
/// Holds one multiplexed connection, opened lazily and dropped after any
/// command error so the next call reconnects.
pub struct RedisJobStore {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
    queue_key: String,
    claim_script: redis::Script,
}

impl RedisJobStore {
    /// Create a store for the given Redis URL and queue name.
    ///
    /// Only parses the URL; no connection is made until the first command,
    /// so an unreachable Redis surfaces as `StoreError::Unavailable` per request.
    pub fn new(redis_url: &str, queue: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            queue_key: format!("{}:queue:{}", KEY_PREFIX, queue),
            claim_script: redis::Script::new(CLAIM_SCRIPT),
        })
    }

    /// Key of a job hash.
    pub fn job_key(job_id: &str) -> String {
        format!("{}:job:{}", KEY_PREFIX, job_id)
    }

    /// Key of the queue list.
    pub fn queue_key(&self) -> &str {
        &self.queue_key
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Map a command result, forgetting the cached connection on failure.
    async fn check<T>(&self, result: RedisResult<T>) -> Result<T, StoreError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                self.conn.lock().await.take();
                Err(StoreError::Unavailable(e.to_string()))
            }
        }
    }

    async fn load(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        let mut conn = self.connection().await?;
        let fields: RedisResult<HashMap<String, String>> = redis::cmd("HGETALL")
            .arg(Self::job_key(job_id))
            .query_async(&mut conn)
            .await;
        let fields = self.check(fields).await?;

        if fields.is_empty() {
            return Ok(None);
        }
        decode(job_id, &fields).map(Some)
    }

    async fn save(&self, job: &Job) -> Result<(), StoreError> {
        let fields = encode(job)?;
        let mut conn = self.connection().await?;
        let result: RedisResult<()> = redis::cmd("HSET")
            .arg(Self::job_key(&job.id))
            .arg(&fields)
            .query_async(&mut conn)
            .await;
        self.check(result).await
    }

    async fn update<F>(&self, job_id: &str, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Job) -> Result<(), StoreError> + Send,
    {
        let mut job = self
            .load(job_id)
            .await?
            .ok_or_else(|| StoreError::Missing(job_id.to_string()))?;
        apply(&mut job)?;
        self.save(&job).await
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn submit(&self, request: LookupRequest) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let job = Job::queued(id.clone(), request);
        let fields = encode(&job)?;

        let mut conn = self.connection().await?;
        // Record and enqueue in one MULTI/EXEC so a job is never half-created.
        let result: RedisResult<()> = redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(Self::job_key(&id))
            .arg(&fields)
            .ignore()
            .cmd("LPUSH")
            .arg(&self.queue_key)
            .arg(&id)
            .ignore()
            .query_async(&mut conn)
            .await;
        self.check(result).await?;

        tracing::debug!("enqueued job {} on {}", id, self.queue_key);
        Ok(id)
    }

    async fn status(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        self.load(job_id).await
    }

    async fn claim_next(&self) -> Result<Option<Job>, StoreError> {
        let job_prefix = Self::job_key("");
        loop {
            let mut conn = self.connection().await?;
            let reply: RedisResult<ClaimReply> = self
                .claim_script
                .key(&self.queue_key)
                .arg(&job_prefix)
                .arg(Utc::now().to_rfc3339())
                .invoke_async(&mut conn)
                .await;
            let Some((id, tag, fields)) = self.check(reply).await? else {
                return Ok(None);
            };

            match tag.as_str() {
                "started" => return decode(&id, &fields).map(Some),
                "missing" => tracing::warn!("queued job {} has no record, skipping", id),
                status => tracing::warn!("queued job {} is already {}, skipping", id, status),
            }
        }
    }

    async fn finish(&self, job_id: &str, result: Option<String>) -> Result<(), StoreError> {
        self.update(job_id, |job| Ok(job.finish(result)?)).await
    }

    async fn fail(&self, job_id: &str, error: &str) -> Result<(), StoreError> {
        let error = error.to_string();
        self.update(job_id, |job| Ok(job.fail(error)?)).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let pong: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        self.check(pong).await.map(|_| ())
    }
}

/// Flatten a job into hash fields. Unset optional fields are omitted.
fn encode(job: &Job) -> Result<Vec<(&'static str, String)>, StoreError> {
    let request = serde_json::to_string(&job.request).map_err(|e| StoreError::Corrupt {
        job_id: job.id.clone(),
        reason: e.to_string(),
    })?;

    let mut fields = vec![
        ("status", job.status.as_str().to_string()),
        ("request", request),
        ("created_at", job.created_at.to_rfc3339()),
    ];
    if let Some(result) = &job.result {
        fields.push(("result", result.clone()));
    }
    if let Some(error) = &job.error {
        fields.push(("error", error.clone()));
    }
    if let Some(started_at) = job.started_at {
        fields.push(("started_at", started_at.to_rfc3339()));
    }
    if let Some(ended_at) = job.ended_at {
        fields.push(("ended_at", ended_at.to_rfc3339()));
    }
    Ok(fields)
}

/// Rebuild a job from its hash fields.
fn decode(job_id: &str, fields: &HashMap<String, String>) -> Result<Job, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        job_id: job_id.to_string(),
        reason,
    };
    let required = |name: &str| {
        fields
            .get(name)
            .ok_or_else(|| corrupt(format!("missing field '{}'", name)))
    };
    let timestamp = |name: &str| -> Result<Option<DateTime<Utc>>, StoreError> {
        fields
            .get(name)
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| corrupt(format!("bad {}: {}", name, e)))
            })
            .transpose()
    };

    let status = required("status")?;
    let status =
        JobStatus::parse(status).ok_or_else(|| corrupt(format!("unknown status '{}'", status)))?;
    let request: LookupRequest =
        serde_json::from_str(required("request")?).map_err(|e| corrupt(e.to_string()))?;
    let created_at = timestamp("created_at")?
        .ok_or_else(|| corrupt("missing field 'created_at'".to_string()))?;

    Ok(Job {
        id: job_id.to_string(),
        request,
        status,
        result: fields.get("result").cloned(),
        error: fields.get("error").cloned(),
        created_at,
        started_at: timestamp("started_at")?,
        ended_at: timestamp("ended_at")?,
    })
}
