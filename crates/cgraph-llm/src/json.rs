//! Locating the JSON object in a model reply.

/// The JSON object in `reply`.
///
/// Structured-output endpoints return bare JSON, but some models still wrap it
/// in a Markdown fence or surround it with prose. Tried in order: the whole
/// reply, a fenced block, the outermost `{...}` span.
#[must_use]
pub fn find_json_object(reply: &str) -> Option<&str> {
    let trimmed = reply.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }

    if let Some(inner) = fenced_block(trimmed) {
        return Some(inner);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// Body of the first ``` fence, with or without a language tag.
fn fenced_block(s: &str) -> Option<&str> {
    let open = s.find("```")?;
    let after_open = open + 3;
    let body_start = after_open + s[after_open..].find('\n')? + 1;
    let close = s[body_start..].find("```")?;

    let body = s[body_start..body_start + close].trim();
    (!body.is_empty()).then_some(body)
}
