//! List Voices operation.

use tracing::debug;

use crate::error::RelayError;
use crate::protocol::ResponseEnvelope;

use super::traits::OperationHandler;
use super::types::{ExecutionContext, OperationParams};

/// Voice catalog for the configured engine tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListVoices;

impl OperationHandler for ListVoices {
    const NAME: &'static str = "list_voices";

    fn from_params(_params: &OperationParams) -> Result<Self, RelayError> {
        Ok(ListVoices)
    }

    fn execute(&self, ctx: &ExecutionContext) -> Result<ResponseEnvelope, RelayError> {
        let catalog = ctx
            .synthesis
            .describe_voices(ctx.engine)?
            .for_engine(ctx.engine);

        debug!(request_id = %ctx.request_id, count = catalog.voices.len(), "Voices listed");
        ResponseEnvelope::ok_json(&catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::testing::{context, FakeSynthesis};
    use crate::protocol::JSON_HEADERS;
    use crate::providers::InMemoryObjectStore;
    use serde_json::Value;
    use std::sync::Arc;

    #[test]
    fn test_catalog_filtered_to_engine() {
        let synthesis = Arc::new(FakeSynthesis::new());
        let ctx = context(synthesis, Arc::new(InMemoryObjectStore::new()));

        let response = ListVoices.execute(&ctx).unwrap();
        assert_eq!(response.headers.as_deref(), Some(JSON_HEADERS));

        let body: Value = serde_json::from_str(response.body.as_deref().unwrap()).unwrap();
        let voices = body["Voices"].as_array().unwrap();
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0]["Id"], "Brian");
    }
}
