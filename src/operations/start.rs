//! Start Synthesis operation.

use serde_json::json;
use tracing::info;

use crate::error::RelayError;
use crate::protocol::ResponseEnvelope;
use crate::providers::{OutputFormat, SynthesisJob, TextType};

use super::traits::OperationHandler;
use super::types::{ExecutionContext, OperationParams};

/// Submit an SSML synthesis job and report where its audio will land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartSynthesis {
    pub ssml: String,
    pub voice: String,
    pub output_format: OutputFormat,
}

impl OperationHandler for StartSynthesis {
    const NAME: &'static str = "start_synthesis";

    fn from_params(params: &OperationParams) -> Result<Self, RelayError> {
        Ok(Self {
            ssml: params.get_string("ssml")?,
            voice: params.get_string("voice")?,
            output_format: OutputFormat::from_filetype(
                params.get_optional_string("filetype").as_deref(),
            ),
        })
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<ResponseEnvelope, RelayError> {
        ctx.storage.create_bucket_if_absent(&ctx.bucket)?;

        let job = SynthesisJob {
            text: self.ssml.clone(),
            text_type: TextType::Ssml,
            voice_id: self.voice.clone(),
            output_format: self.output_format,
            output_bucket: ctx.bucket.clone(),
            engine: ctx.engine,
        };
        let submitted = ctx.synthesis.start_synthesis_task(&job)?;

        // Report the provider's current view, not the submission snapshot
        let task = ctx.synthesis.get_synthesis_task(&submitted.task_id)?;

        info!(
            request_id = %ctx.request_id,
            task_id = %task.task_id,
            voice = %self.voice,
            format = self.output_format.as_str(),
            "Synthesis task started"
        );

        ResponseEnvelope::ok_json(&json!({
            "task_id": task.task_id,
            "uri": task.output_uri,
        }))
    }
}
