/// Static per-agent config rendered from templates, always refreshed on
/// provision and re-provision.
pub const STATIC_OVERWRITE_FILES: &[&str] = &[
    "AGENTS.md",
    "SOUL.md",
    "AUTONOMY.md",
    "TOOLS.md",
    "IDENTITY.md",
    "BOOT.md",
    "HEARTBEAT.md",
];

/// Written once at first provision, unless `force_bootstrap` is set.
pub const BOOTSTRAP_FILE: &str = "BOOTSTRAP.md";

/// User/agent-editable runtime state. Provisioned if missing, never
/// overwritten once present on the gateway.
pub const PRESERVE_EDITABLE_FILES: &[&str] = &["SELF.md", "USER.md", "MEMORY.md"];

pub const MEMORY_FALLBACK_CONTENT: &str = "# MEMORY\n\nBootstrap pending.\n";

pub const HEARTBEAT_LEAD_TEMPLATE: &str = "HEARTBEAT_LEAD.md";
pub const HEARTBEAT_AGENT_TEMPLATE: &str = "HEARTBEAT_AGENT.md";

/// Maps a board-agent file name to its main-agent template counterpart.
/// Files with no entry render with the same template for both.
pub fn main_template_for(file: &str) -> &str {
    match file {
        "AGENTS.md" => "MAIN_AGENTS.md",
        "HEARTBEAT.md" => "MAIN_HEARTBEAT.md",
        "USER.md" => "MAIN_USER.md",
        "BOOT.md" => "MAIN_BOOT.md",
        "TOOLS.md" => "MAIN_TOOLS.md",
        other => other,
    }
}

/// Determines whether `BOOTSTRAP.md` should be part of this provision
/// call. Mirrors `_should_include_bootstrap`: included on first provision,
/// when forced, or when the gateway's existing file index doesn't clearly
/// mark it as already present.
pub fn should_include_bootstrap(
    action_is_update: bool,
    force_bootstrap: bool,
    existing_files_index: Option<&[String]>,
) -> bool {
    if !action_is_update || force_bootstrap {
        return true;
    }
    match existing_files_index {
        Some(files) if !files.is_empty() => !files.iter().any(|f| f == BOOTSTRAP_FILE),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_included_on_first_provision() {
        assert!(should_include_bootstrap(false, false, None));
    }

    #[test]
    fn bootstrap_skipped_on_update_when_already_present() {
        let existing = vec!["BOOTSTRAP.md".to_string()];
        assert!(!should_include_bootstrap(true, false, Some(&existing)));
    }

    #[test]
    fn bootstrap_forced_even_if_present() {
        let existing = vec!["BOOTSTRAP.md".to_string()];
        assert!(should_include_bootstrap(true, true, Some(&existing)));
    }

    #[test]
    fn bootstrap_skipped_on_update_with_no_known_file_index() {
        assert!(!should_include_bootstrap(true, false, None));
    }

    #[test]
    fn bootstrap_skipped_on_update_with_confirmed_empty_index() {
        assert!(!should_include_bootstrap(true, false, Some(&[])));
    }

    #[test]
    fn bootstrap_included_on_update_when_index_omits_it() {
        let existing = vec!["AGENTS.md".to_string()];
        assert!(should_include_bootstrap(true, false, Some(&existing)));
    }

    #[test]
    fn main_template_maps_known_files() {
        assert_eq!(main_template_for("AGENTS.md"), "MAIN_AGENTS.md");
        assert_eq!(main_template_for("SOUL.md"), "SOUL.md");
    }
}
