use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;
use sha2::{Digest, Sha256};

static TOKEN_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a fresh bearer-style token. Not cryptographically derived from
/// any secret state the caller holds, so a counter-mixed hash is
/// sufficient entropy for a per-provision shared secret.
pub fn generate_token() -> String {
    let count = TOKEN_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut hasher = Sha256::new();
    hasher.update(count.to_le_bytes());
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    format!("bctl_{:x}", hasher.finalize())
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Parses `TOOLS.md` content as `KEY=value` lines, ignoring blank lines and
/// lines starting with `#`. Mirrors `_TOOLS_KV_RE` (`^[A-Z0-9_]+=.*$`).
pub fn parse_tools_md(content: &str) -> BTreeMap<String, String> {
    let re = Regex::new(r"^(?P<key>[A-Z0-9_]+)=(?P<value>.*)$").expect("static regex");
    let mut out = BTreeMap::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some(caps) = re.captures(trimmed) {
            out.insert(caps["key"].to_string(), caps["value"].to_string());
        }
    }
    out
}

pub fn recover_auth_token(tools_md: &str) -> Option<String> {
    parse_tools_md(tools_md).get("AUTH_TOKEN").cloned()
}

pub fn render_tools_md(auth_token: &str) -> String {
    format!("AUTH_TOKEN={auth_token}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tools_md_ignores_comments_and_blank_lines() {
        let content = "# comment\n\nAUTH_TOKEN=abc123\nOTHER_KEY=value with spaces\n";
        let parsed = parse_tools_md(content);
        assert_eq!(parsed.get("AUTH_TOKEN"), Some(&"abc123".to_string()));
        assert_eq!(
            parsed.get("OTHER_KEY"),
            Some(&"value with spaces".to_string())
        );
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn parse_tools_md_rejects_lowercase_keys() {
        let parsed = parse_tools_md("auth_token=nope\n");
        assert!(parsed.is_empty());
    }

    #[test]
    fn generated_tokens_are_unique_and_hash_deterministically() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), hash_token(&b));
    }

    #[test]
    fn recover_auth_token_reads_rendered_tools_md() {
        let rendered = render_tools_md("tok-123");
        assert_eq!(recover_auth_token(&rendered), Some("tok-123".to_string()));
    }
}
