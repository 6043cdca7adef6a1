use uuid::Uuid;

/// Generates a fresh random identifier for a new entity row.
pub fn new_id() -> Uuid {
    Uuid::new_v4()
}

/// Lowercases `value`, collapses runs of non `[a-z0-9]` characters to a single
/// `-`, and trims leading/trailing `-`. Falls back to a random hex suffix when
/// the input has no retainable characters (mirrors the gateway-side slugifier
/// so agent keys and workspace paths never collide on an empty slug).
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_was_sep = false;
    for ch in value.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('-');
            last_was_sep = true;
        }
    }
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        Uuid::new_v4().simple().to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Scout Agent  #1"), "scout-agent-1");
        assert_eq!(slugify("  Lead Agent  "), "lead-agent");
    }

    #[test]
    fn slugify_empty_input_falls_back_to_random() {
        let a = slugify("###");
        let b = slugify("###");
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }
}
