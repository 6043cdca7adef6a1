//! Board visibility helpers shared by every handler: which boards an
//! actor's feed/activity/agent-list queries are allowed to span
//! (spec.md §4.4 row 1 generalized from a single board to "all boards
//! this actor may read").

use boardctl_board::authorization::member_can_read;
use boardctl_core::Store;
use boardctl_types::model::{Board, BoardId};

use crate::auth::Authenticated;
use crate::error::ApiError;

/// Every board id the caller may read. A user sees every board in their
/// org they have read access to; an agent sees only its own board.
pub fn visible_board_ids(store: &Store, auth: &Authenticated) -> Vec<BoardId> {
    if let Some(member) = &auth.member {
        return store
            .list_boards_for_org(member.org_id)
            .into_iter()
            .filter(|board| member_can_read(member, board))
            .map(|board| board.id)
            .collect();
    }
    if let Some(agent) = &auth.agent {
        return agent.board_id.into_iter().collect();
    }
    Vec::new()
}

/// Fetches a single board and 404s if it doesn't exist, without yet
/// checking whether the caller may see it (callers run the appropriate
/// `boardctl_board::authorization` check next).
pub fn get_board_or_404(store: &Store, board_id: BoardId) -> Result<Board, ApiError> {
    store
        .get_board(board_id)
        .ok_or_else(|| ApiError::not_found("board not found"))
}
