//! Target side of a transfer.
//!
//! Small transfers replace the target's content in one call. Large transfers
//! go through a staging channel: parts are uploaded to an execution and
//! published together on commit. A failure after the execution is opened
//! triggers a best-effort abort, and the original error is returned with the
//! abort outcome attached.

mod execution;

pub use execution::{ExecutionState, TargetExecution};

use tracing::{debug, info, warn};

use crate::api::{StreamInfo, TargetApi};
use crate::error::{CopyError, Result};
use crate::staging::StagedData;

/// Writes staged data to one target dataset.
pub struct TargetWriter<'a> {
    api: &'a dyn TargetApi,
    part_size: usize,
}

impl<'a> TargetWriter<'a> {
    pub fn new(api: &'a dyn TargetApi, part_size: usize) -> Self {
        Self {
            api,
            part_size: part_size.max(1),
        }
    }

    /// Replace the dataset's contents in a single call. Returns rows written.
    pub async fn replace(&self, dataset_id: &str, staged: StagedData) -> Result<u64> {
        let rows = staged.rows();
        let body = staged.into_csv()?;
        debug!("{}: replacing with {} bytes", dataset_id, body.len());
        self.api.replace_data(dataset_id, body).await?;
        info!("{}: replaced with {} rows", dataset_id, rows);
        Ok(rows)
    }

    /// Multi-part write through a staging channel. `on_part` is called with
    /// (parts uploaded, total parts) after every part.
    pub async fn write_staged(
        &self,
        dataset_id: &str,
        staged: StagedData,
        on_part: &mut (dyn FnMut(u32, u32) + Send),
    ) -> Result<u64> {
        let stream = self.stream_for(dataset_id).await?;
        let mut execution = TargetExecution::open(self.api, stream.id).await?;
        let rows = staged.rows();

        match self.upload_and_commit(&mut execution, staged, on_part).await {
            Ok(()) => {
                info!(
                    "{}: committed {} rows in {} parts (execution {})",
                    dataset_id,
                    rows,
                    execution.parts().len(),
                    execution.id()
                );
                Ok(rows)
            }
            Err(e) => {
                warn!(
                    "{}: staged write failed after {} parts, aborting execution {}: {}",
                    dataset_id,
                    execution.parts().len(),
                    execution.id(),
                    e
                );
                let abort_error = execution.abort(self.api).await.err().map(|ae| ae.to_string());
                Err(CopyError::StagedWrite {
                    execution_id: execution.id(),
                    source: Box::new(e),
                    abort_error,
                })
            }
        }
    }

    async fn stream_for(&self, dataset_id: &str) -> Result<StreamInfo> {
        match self.api.find_stream(dataset_id).await? {
            Some(stream) => {
                debug!("{}: using stream {}", dataset_id, stream.id);
                Ok(stream)
            }
            None => {
                let stream = self.api.create_stream(dataset_id).await?;
                info!("{}: created stream {}", dataset_id, stream.id);
                Ok(stream)
            }
        }
    }

    async fn upload_and_commit(
        &self,
        execution: &mut TargetExecution,
        staged: StagedData,
        on_part: &mut (dyn FnMut(u32, u32) + Send),
    ) -> Result<()> {
        let total = staged.part_count(self.part_size);
        let mut parts = staged.into_parts(self.part_size)?;
        while let Some(body) = parts.next_part()? {
            let part = execution.upload(self.api, body).await?;
            on_part(part, total);
        }
        execution.commit(self.api).await
    }
}
