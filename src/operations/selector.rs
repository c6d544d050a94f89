//! Operation selection.
//!
//! The decoded body is matched against an ordered table of selector key
//! sets. Keys are tested for presence only; the first complete match wins.

use crate::error::{OperationErrorKind, RelayError, RelayResult};

use super::traits::OperationHandler;
use super::types::OperationParams;
use super::{
    DeleteFiles, DownloadFile, HealthCheck, ListVoices, Operation, StartSynthesis,
    TaskStatusQuery,
};

type Builder = fn(&OperationParams) -> RelayResult<Operation>;

struct Selector {
    keys: &'static [&'static str],
    build: Builder,
}

fn build<H>(params: &OperationParams) -> RelayResult<Operation>
where
    H: OperationHandler,
    Operation: From<H>,
{
    H::from_params(params).map(Operation::from)
}

/// Dispatch table in priority order.
const SELECTORS: &[Selector] = &[
    Selector {
        keys: &["start", "ssml", "voice"],
        build: build::<StartSynthesis>,
    },
    Selector {
        keys: &["taskStatus", "task_id"],
        build: build::<TaskStatusQuery>,
    },
    Selector {
        keys: &["downloadFile", "uri"],
        build: build::<DownloadFile>,
    },
    Selector {
        keys: &["delete"],
        build: build::<DeleteFiles>,
    },
    Selector {
        keys: &["systemStatus"],
        build: build::<HealthCheck>,
    },
    Selector {
        keys: &["requestVoices"],
        build: build::<ListVoices>,
    },
];

/// Select and build the operation requested by `params`.
pub fn select(params: &OperationParams) -> RelayResult<Operation> {
    if params.is_object() {
        for selector in SELECTORS {
            if selector.keys.iter().all(|key| params.has(key)) {
                return (selector.build)(params);
            }
        }
    }

    Err(RelayError::Operation {
        kind: OperationErrorKind::InvalidPostData,
    })
}
