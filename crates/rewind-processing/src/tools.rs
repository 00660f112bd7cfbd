//! Helpers for locating and invoking external media tools.

use anyhow::{anyhow, Result};

/// Validate that a tool path doesn't contain shell metacharacters or traversal sequences
pub fn validate_tool_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Path contains dangerous characters: {}", path));
    }

    if path.contains("..") {
        return Err(anyhow!("Path contains directory traversal: {}", path));
    }

    if !path
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '\\'))
    {
        return Err(anyhow!("Path contains unsafe characters: {}", path));
    }

    Ok(())
}
