//! MCP tool implementations.

pub mod cache;
pub mod worker_activate;
pub mod worker_fetch;

/// Pull the JSON text payload out of a tool result.
#[cfg(test)]
pub(crate) fn result_text(result: &rmcp::model::CallToolResult) -> String {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content")
        .to_string()
}
