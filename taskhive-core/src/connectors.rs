//! Collaborator contract for connector tools.
//!
//! The ~20 external-service connectors (documents, storage, mail, calendar,
//! …) live outside this crate but conform to one contract so the registry
//! treats them identically to built-ins: they report whether they are
//! enabled, execute a named action against an input payload, and call the
//! shared approval primitive before any create/update/delete verb. A denial
//! surfaces as a connector-specific "user denied" error and the action
//! performs no side effect.

use crate::approval::ApprovalScope;
use crate::error::RuntimeError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Uniform response shape produced by every connector action.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectorResponse {
    pub success: bool,
    /// The action verb that was executed.
    pub action: String,
    /// Transport status, when the connector talks to an HTTP service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Structured payload for the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Raw response body, when structured parsing was not possible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ConnectorResponse {
    pub fn ok(action: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            action: action.into(),
            status: None,
            data: Some(data),
            raw: None,
        }
    }
}

/// An external-service tool registered with the runtime.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Tool name as it appears in the manifest.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Disabled connectors are omitted from the manifest entirely and
    /// unresolvable by name.
    fn is_enabled(&self) -> bool;

    /// Structural description of the accepted input fields.
    fn input_schema(&self) -> Value;

    /// Executes one action. Implementations must call
    /// [`ApprovalScope::require_approval`] before any mutating verb and let
    /// the denial propagate.
    async fn execute_action(
        &self,
        approvals: &ApprovalScope,
        input: Value,
    ) -> Result<ConnectorResponse, RuntimeError>;
}
