//! Health Check operation.

use crate::error::RelayError;
use crate::protocol::ResponseEnvelope;

use super::traits::OperationHandler;
use super::types::{ExecutionContext, OperationParams};

/// Liveness probe. Touches no provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheck;

impl OperationHandler for HealthCheck {
    const NAME: &'static str = "health_check";

    fn from_params(_params: &OperationParams) -> Result<Self, RelayError> {
        Ok(HealthCheck)
    }

    fn execute(&self, _ctx: &ExecutionContext) -> Result<ResponseEnvelope, RelayError> {
        Ok(ResponseEnvelope::ok_text("OK"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::testing::{context, FakeSynthesis};
    use crate::providers::InMemoryObjectStore;
    use std::sync::Arc;

    #[test]
    fn test_health_makes_no_provider_calls() {
        let synthesis = Arc::new(FakeSynthesis::new());
        let ctx = context(synthesis.clone(), Arc::new(InMemoryObjectStore::new()));

        let response = HealthCheck.execute(&ctx).unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body.as_deref(), Some("OK"));
        assert_eq!(synthesis.total_calls(), 0);
    }
}
