use shared::protocol::RawGestureEvent;

/// Resolves the string a gesture is classified by.
///
/// Order is fixed: non-empty metadata description, then non-empty package
/// title, then the raw match name. Always returns a value, possibly empty.
pub fn resolve_identity(event: &RawGestureEvent) -> String {
    let metadata = event.metadata();
    if !metadata.description.is_empty() {
        return metadata.description.clone();
    }
    match metadata.title.as_deref() {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => event.name().to_string(),
    }
}

#[cfg(test)]
#[path = "tests/identity_tests.rs"]
mod tests;
