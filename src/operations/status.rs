//! Task Status operation.

use tracing::debug;

use crate::error::RelayError;
use crate::protocol::ResponseEnvelope;

use super::traits::OperationHandler;
use super::types::{ExecutionContext, OperationParams};

/// Report a synthesis task as `COMPLETE`, `FAILED` or `RUNNING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatusQuery {
    pub task_id: String,
}

impl OperationHandler for TaskStatusQuery {
    const NAME: &'static str = "task_status";

    fn from_params(params: &OperationParams) -> Result<Self, RelayError> {
        Ok(Self {
            task_id: params.get_string("task_id")?,
        })
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<ResponseEnvelope, RelayError> {
        let task = ctx.synthesis.get_synthesis_task(&self.task_id)?;
        let status = task.status.normalized();

        debug!(
            request_id = %ctx.request_id,
            task_id = %self.task_id,
            status,
            reason = ?task.status_reason,
            "Task status queried"
        );
        Ok(ResponseEnvelope::ok_text(status))
    }
}
