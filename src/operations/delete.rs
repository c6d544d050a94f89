//! Delete File(s) operation.

use tracing::{info, warn};

use crate::error::{OperationErrorKind, RelayError};
use crate::protocol::ResponseEnvelope;

use super::traits::OperationHandler;
use super::types::{ExecutionContext, OperationParams};

/// Delete the object matching `uri`, or every object when no uri is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFiles {
    pub uri: Option<String>,
}

impl OperationHandler for DeleteFiles {
    const NAME: &'static str = "delete_files";

    fn from_params(params: &OperationParams) -> Result<Self, RelayError> {
        let uri = params
            .get_strict_optional_string("uri")?
            .filter(|uri| !uri.is_empty());
        Ok(Self { uri })
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<ResponseEnvelope, RelayError> {
        let objects = ctx.storage.list_objects(&ctx.bucket)?;

        match &self.uri {
            Some(uri) => {
                if let Some(object) = objects.iter().find(|o| uri.contains(&o.key)) {
                    ctx.storage.delete_object(&ctx.bucket, &object.key)?;
                    info!(request_id = %ctx.request_id, key = %object.key, "Deleted object");
                }
            }
            None => {
                let total = objects.len();
                let mut failed = 0;
                for object in &objects {
                    if let Err(e) = ctx.storage.delete_object(&ctx.bucket, &object.key) {
                        warn!(
                            request_id = %ctx.request_id,
                            key = %object.key,
                            error = %e,
                            "Failed to delete object"
                        );
                        failed += 1;
                    }
                }
                info!(
                    request_id = %ctx.request_id,
                    deleted = total - failed,
                    failed,
                    "Deleted all objects"
                );
                if failed > 0 {
                    return Err(RelayError::Operation {
                        kind: OperationErrorKind::PartialDelete { failed, total },
                    });
                }
            }
        }

        Ok(ResponseEnvelope::ok_text("COMPLETE"))
    }
}
