//! Reply cleanup helpers shared by callers that expect JSON bodies.

/// Strip a leading/trailing markdown code fence from a model reply.
/// Models regularly wrap JSON in ```json ... ``` despite instructions.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
