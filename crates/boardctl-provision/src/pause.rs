use boardctl_types::model::BoardMemory;

const PAUSE_COMMAND: &str = "/pause";
const RESUME_COMMAND: &str = "/resume";

/// A board is paused when its most recent **chat** memory row
/// (case-insensitive, trimmed) is `/pause` more recently than any
/// `/resume` — i.e. the latest of the two commands wins. `memories` need
/// not be sorted; this scans for the maximum `created_at`.
pub fn is_board_paused(memories: &[BoardMemory]) -> bool {
    let latest_command = memories
        .iter()
        .filter(|m| m.is_chat)
        .filter(|m| {
            let trimmed = m.content.trim().to_lowercase();
            trimmed == PAUSE_COMMAND || trimmed == RESUME_COMMAND
        })
        .max_by_key(|m| m.created_at);

    matches!(
        latest_command,
        Some(m) if m.content.trim().eq_ignore_ascii_case(PAUSE_COMMAND)
    )
}
