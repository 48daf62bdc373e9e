//! worker_activate tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use revcache_client::Worker;
use revcache_core::Error;

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerActivateOutput {
    pub state: String,
    /// False when reconciliation failed; activation still completed.
    pub reconciled: bool,
    pub scanned: usize,
    pub kept: usize,
    pub purged: usize,
    pub failed: usize,
}

/// Implementation of the worker_activate tool.
pub async fn activate_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let stats = worker.activate().await;

    let output = WorkerActivateOutput {
        state: worker.state().to_string(),
        reconciled: stats.is_some(),
        scanned: stats.map_or(0, |s| s.scanned),
        kept: stats.map_or(0, |s| s.kept),
        purged: stats.map_or(0, |s| s.purged),
        failed: stats.map_or(0, |s| s.failed),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
