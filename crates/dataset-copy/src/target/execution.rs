//! One staged write on the target.

use tracing::{debug, warn};

use crate::api::TargetApi;
use crate::error::{CopyError, Result};

/// Lifecycle of a [`TargetExecution`]. Leaves `Open` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Open,
    Committed,
    Aborted,
}

/// An open multi-part write. Parts are numbered contiguously from 1 and
/// become visible on the target only when the execution commits.
#[derive(Debug)]
pub struct TargetExecution {
    stream_id: i64,
    id: i64,
    parts: Vec<u32>,
    state: ExecutionState,
}

impl TargetExecution {
    /// Open a new execution on a staging channel.
    pub async fn open(api: &dyn TargetApi, stream_id: i64) -> Result<Self> {
        let id = api.create_execution(stream_id).await?;
        debug!("stream {}: opened execution {}", stream_id, id);
        Ok(Self {
            stream_id,
            id,
            parts: Vec::new(),
            state: ExecutionState::Open,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn stream_id(&self) -> i64 {
        self.stream_id
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Part numbers uploaded so far, in order.
    pub fn parts(&self) -> &[u32] {
        &self.parts
    }

    fn ensure_open(&self, action: &str) -> Result<()> {
        if self.state != ExecutionState::Open {
            return Err(CopyError::transfer(
                format!("execution {}", self.id),
                format!("cannot {} an execution that is {:?}", action, self.state),
            ));
        }
        Ok(())
    }

    /// Upload the next part and return its number.
    pub async fn upload(&mut self, api: &dyn TargetApi, body: String) -> Result<u32> {
        self.ensure_open("upload to")?;
        let part = self.parts.len() as u32 + 1;
        api.upload_part(self.stream_id, self.id, part, body).await?;
        self.parts.push(part);
        Ok(part)
    }

    pub async fn commit(&mut self, api: &dyn TargetApi) -> Result<()> {
        self.ensure_open("commit")?;
        api.commit_execution(self.stream_id, self.id).await?;
        self.state = ExecutionState::Committed;
        debug!(
            "stream {}: committed execution {} with {} parts",
            self.stream_id,
            self.id,
            self.parts.len()
        );
        Ok(())
    }

    /// Best-effort abort. The execution counts as aborted whatever the
    /// outcome of the call.
    pub async fn abort(&mut self, api: &dyn TargetApi) -> Result<()> {
        self.ensure_open("abort")?;
        self.state = ExecutionState::Aborted;
        let result = api.abort_execution(self.stream_id, self.id).await;
        if let Err(e) = &result {
            warn!("stream {}: abort of execution {} failed: {}", self.stream_id, self.id, e);
        }
        result
    }
}
