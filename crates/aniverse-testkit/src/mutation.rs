//! Scripted store for mutation tests

use aniverse_core::{Clock, RecordId, SystemClock};
use aniverse_sync::{MutationClient, MutationError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How the store answers the next call
#[derive(Debug, Clone, PartialEq)]
pub enum Scripted {
    /// Store the row, assigning `id` and `created_at` if missing
    Accept,
    /// Answer with exactly this row
    Respond(Value),
    /// Fail the call
    Fail(MutationError),
}

/// Kind of store call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    /// `create`
    Create,
    /// `update`
    Update,
    /// `delete`
    Delete,
}

/// A call the store received
#[derive(Debug, Clone, PartialEq)]
pub struct MutationCall {
    /// Operation
    pub op: MutationOp,
    /// Target table
    pub table: String,
    /// Target id for updates and deletes
    pub id: Option<RecordId>,
    /// Row or patch sent
    pub row: Option<Value>,
}

struct Script {
    responses: VecDeque<Scripted>,
    calls: Vec<MutationCall>,
    stored: Vec<Value>,
    next_id: u64,
    delay: Option<Duration>,
}

/// Mutation client answering from a queue of scripted responses.
///
/// An empty queue answers [`Scripted::Accept`]. Calls can be held at a gate
/// with [`pause`](Self::pause) to interleave feed events before the answer.
pub struct ScriptedMutationClient {
    script: Mutex<Script>,
    gate: watch::Sender<bool>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ScriptedMutationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let script = self.script.lock();
        f.debug_struct("ScriptedMutationClient")
            .field("queued", &script.responses.len())
            .field("calls", &script.calls.len())
            .field("paused", &!*self.gate.borrow())
            .finish()
    }
}

impl Default for ScriptedMutationClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedMutationClient {
    /// Create a client that accepts everything, stamping rows with system time
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a client stamping `created_at` from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            script: Mutex::new(Script {
                responses: VecDeque::new(),
                calls: Vec::new(),
                stored: Vec::new(),
                next_id: 1,
                delay: None,
            }),
            gate,
            clock,
        }
    }

    /// Queue the answer for a future call
    pub fn push(&self, response: Scripted) {
        self.script.lock().responses.push_back(response);
    }

    /// Queue a failure
    pub fn fail_next(&self, error: MutationError) {
        self.push(Scripted::Fail(error));
    }

    /// Delay every answer
    pub fn set_delay(&self, delay: Duration) {
        self.script.lock().delay = Some(delay);
    }

    /// Hold calls until [`resume`](Self::resume)
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    /// Release held calls
    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    /// Calls received so far, including held ones
    pub fn calls(&self) -> Vec<MutationCall> {
        self.script.lock().calls.clone()
    }

    /// Rows the store accepted, as it answered them
    pub fn stored(&self) -> Vec<Value> {
        self.script.lock().stored.clone()
    }

    /// Most recently accepted row
    pub fn last_stored(&self) -> Option<Value> {
        self.script.lock().stored.last().cloned()
    }

    fn record(&self, call: MutationCall) -> Option<Duration> {
        let mut script = self.script.lock();
        script.calls.push(call);
        script.delay
    }

    async fn wait_turn(&self, delay: Option<Duration>) -> Scripted {
        let mut gate = self.gate.subscribe();
        while !*gate.borrow_and_update() {
            if gate.changed().await.is_err() {
                break;
            }
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .responses
            .pop_front()
            .unwrap_or(Scripted::Accept)
    }

    fn store(&self, mut row: Value) -> Value {
        let mut script = self.script.lock();
        if let Value::Object(map) = &mut row {
            if !map.contains_key("id") {
                map.insert("id".into(), json!(format!("srv-{}", script.next_id)));
                script.next_id += 1;
            }
            if !map.contains_key("created_at") {
                map.insert("created_at".into(), json!(self.clock.now().to_rfc3339()));
            }
        }
        script.stored.push(row.clone());
        row
    }
}

#[async_trait]
impl MutationClient for ScriptedMutationClient {
    async fn create(&self, table: &str, row: Value) -> Result<Value, MutationError> {
        let delay = self.record(MutationCall {
            op: MutationOp::Create,
            table: table.to_string(),
            id: None,
            row: Some(row.clone()),
        });
        match self.wait_turn(delay).await {
            Scripted::Accept => Ok(self.store(row)),
            Scripted::Respond(answer) => Ok(answer),
            Scripted::Fail(error) => Err(error),
        }
    }

    async fn update(
        &self,
        table: &str,
        id: &RecordId,
        patch: Value,
    ) -> Result<Value, MutationError> {
        let delay = self.record(MutationCall {
            op: MutationOp::Update,
            table: table.to_string(),
            id: Some(id.clone()),
            row: Some(patch.clone()),
        });
        match self.wait_turn(delay).await {
            Scripted::Accept => {
                let mut row = patch;
                if let Value::Object(map) = &mut row {
                    map.insert("id".into(), json!(id.as_str()));
                }
                Ok(self.store(row))
            }
            Scripted::Respond(answer) => Ok(answer),
            Scripted::Fail(error) => Err(error),
        }
    }

    async fn delete(&self, table: &str, id: &RecordId) -> Result<(), MutationError> {
        let delay = self.record(MutationCall {
            op: MutationOp::Delete,
            table: table.to_string(),
            id: Some(id.clone()),
            row: None,
        });
        match self.wait_turn(delay).await {
            Scripted::Accept | Scripted::Respond(_) => Ok(()),
            Scripted::Fail(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_accept_assigns_id_and_timestamp() {
        let client = ScriptedMutationClient::new();
        let row = client
            .create("comments", json!({"post_id": "1", "content": "hola"}))
            .await
            .unwrap();

        assert_eq!(row["id"], json!("srv-1"));
        assert!(row["created_at"].is_string());
        assert_eq!(client.stored(), vec![row]);
        assert_eq!(client.calls()[0].op, MutationOp::Create);
    }

    #[tokio::test]
    async fn test_scripted_answers_in_order() {
        let client = ScriptedMutationClient::new();
        client.fail_next(MutationError::network("offline"));
        client.push(Scripted::Respond(json!({"id": "x"})));

        assert_matches!(
            client.delete("posts", &RecordId::new("1")).await,
            Err(MutationError::Network { .. })
        );
        assert_eq!(
            client.update("posts", &RecordId::new("1"), json!({})).await.unwrap(),
            json!({"id": "x"})
        );
        assert!(client.delete("posts", &RecordId::new("1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_pause_holds_calls() {
        let client = Arc::new(ScriptedMutationClient::new());
        client.pause();

        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.create("posts", json!({})).await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(client.calls().len(), 1);
        assert!(client.stored().is_empty());

        client.resume();
        assert!(task.await.unwrap().is_ok());
        assert_eq!(client.stored().len(), 1);
    }
}
