//! Router operations.
//!
//! Each operation is a typed request built from the decoded body by the
//! selector table, then executed against the injected providers.
//!
//! ## Available Operations
//!
//! | Selector keys | Operation |
//! |---|---|
//! | `start`, `ssml`, `voice` | [`StartSynthesis`] |
//! | `taskStatus`, `task_id` | [`TaskStatusQuery`] |
//! | `downloadFile`, `uri` | [`DownloadFile`] |
//! | `delete` | [`DeleteFiles`] |
//! | `systemStatus` | [`HealthCheck`] |
//! | `requestVoices` | [`ListVoices`] |

mod delete;
mod download;
mod health;
mod selector;
mod start;
mod status;
#[cfg(test)]
pub(crate) mod testing;
mod traits;
mod types;
mod voices;

pub use delete::DeleteFiles;
pub use download::DownloadFile;
pub use health::HealthCheck;
pub use selector::select;
pub use start::StartSynthesis;
pub use status::TaskStatusQuery;
pub use traits::OperationHandler;
pub use types::{ExecutionContext, OperationParams};
pub use voices::ListVoices;

use crate::error::RelayError;
use crate::protocol::ResponseEnvelope;

/// A selected operation with its typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    StartSynthesis(StartSynthesis),
    TaskStatus(TaskStatusQuery),
    DownloadFile(DownloadFile),
    Delete(DeleteFiles),
    HealthCheck(HealthCheck),
    ListVoices(ListVoices),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::StartSynthesis(_) => StartSynthesis::NAME,
            Operation::TaskStatus(_) => TaskStatusQuery::NAME,
            Operation::DownloadFile(_) => DownloadFile::NAME,
            Operation::Delete(_) => DeleteFiles::NAME,
            Operation::HealthCheck(_) => HealthCheck::NAME,
            Operation::ListVoices(_) => ListVoices::NAME,
        }
    }

    pub fn execute(&self, ctx: &ExecutionContext) -> Result<ResponseEnvelope, RelayError> {
        match self {
            Operation::StartSynthesis(op) => op.execute(ctx),
            Operation::TaskStatus(op) => op.execute(ctx),
            Operation::DownloadFile(op) => op.execute(ctx),
            Operation::Delete(op) => op.execute(ctx),
            Operation::HealthCheck(op) => op.execute(ctx),
            Operation::ListVoices(op) => op.execute(ctx),
        }
    }
}

macro_rules! impl_from_handler {
    ($($handler:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$handler> for Operation {
                fn from(op: $handler) -> Self {
                    Operation::$variant(op)
                }
            }
        )*
    };
}

impl_from_handler! {
    StartSynthesis => StartSynthesis,
    TaskStatusQuery => TaskStatus,
    DownloadFile => DownloadFile,
    DeleteFiles => Delete,
    HealthCheck => HealthCheck,
    ListVoices => ListVoices,
}
