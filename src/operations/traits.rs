//! Operation handler trait.

use crate::error::RelayError;
use crate::protocol::ResponseEnvelope;

use super::types::{ExecutionContext, OperationParams};

/// One operation the router can dispatch to.
///
/// A handler is built from the decoded body once its selector keys have
/// matched, then executed against the providers in the context.
pub trait OperationHandler: Sized {
    /// Operation name used in logs and audit entries.
    const NAME: &'static str;

    /// Extract and type-check the handler's parameters.
    fn from_params(params: &OperationParams) -> Result<Self, RelayError>;

    /// Run the operation.
    ///
    /// Provider calls block; this is called from the blocking pool.
    fn execute(&self, ctx: &ExecutionContext) -> Result<ResponseEnvelope, RelayError>;
}
