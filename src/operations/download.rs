//! Download File operation.

use std::io::Read;

use tracing::{debug, info};

use crate::error::{OperationErrorKind, RelayError};
use crate::protocol::ResponseEnvelope;
use crate::providers::OutputFormat;

use super::traits::OperationHandler;
use super::types::{ExecutionContext, OperationParams};

/// Return the audio of the first stored object whose key appears in `uri`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFile {
    pub uri: String,
    pub output_format: OutputFormat,
}

impl OperationHandler for DownloadFile {
    const NAME: &'static str = "download_file";

    fn from_params(params: &OperationParams) -> Result<Self, RelayError> {
        Ok(Self {
            uri: params.get_string("uri")?,
            output_format: OutputFormat::from_filetype(
                params.get_optional_string("filetype").as_deref(),
            ),
        })
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<ResponseEnvelope, RelayError> {
        let objects = ctx.storage.list_objects(&ctx.bucket)?;
        let object = objects
            .iter()
            .find(|o| self.uri.contains(&o.key))
            .ok_or(RelayError::Operation {
                kind: OperationErrorKind::NoAudioGenerated,
            })?;

        let mut audio = Vec::with_capacity(preallocation(object.size));
        {
            let mut stream = ctx.storage.get_object(&ctx.bucket, &object.key)?;
            stream
                .read_to_end(&mut audio)
                .map_err(|e| RelayError::Operation {
                    kind: OperationErrorKind::StreamRead {
                        message: e.to_string(),
                    },
                })?;
        }

        info!(
            request_id = %ctx.request_id,
            key = %object.key,
            bytes = audio.len(),
            "Audio downloaded"
        );
        debug!(content_type = self.output_format.content_type(), "Encoding audio body");

        Ok(ResponseEnvelope::ok_binary(
            &audio,
            self.output_format.content_type(),
        ))
    }
}

/// Upper bound on the buffer reserved from a listed object size.
const MAX_PREALLOCATION: usize = 1 << 20;

/// Capacity to reserve for an object the listing reports as `size` bytes.
///
/// Listings are advisory, so the reservation is capped and the read grows
/// the buffer as needed.
fn preallocation(size: u64) -> usize {
    usize::try_from(size).map_or(MAX_PREALLOCATION, |size| size.min(MAX_PREALLOCATION))
}
