//! The closed set of JSON-RPC methods this control plane is allowed to call
//! on a gateway. Kept as named constants so a typo doesn't silently become
//! a new, unrecognized RPC call.

pub const SESSIONS_LIST: &str = "sessions.list";
pub const SESSIONS_GET: &str = "sessions.get";
pub const SESSIONS_RESET: &str = "sessions.reset";
pub const SESSIONS_DELETE: &str = "sessions.delete";
pub const SESSIONS_SPAWN: &str = "sessions.spawn";
pub const SESSIONS_SEND: &str = "sessions.send";
pub const SESSIONS_HISTORY: &str = "sessions.history";
pub const AGENTS_LIST: &str = "agents.list";
pub const AGENTS_FILES_LIST: &str = "agents.files.list";
pub const AGENTS_FILES_GET: &str = "agents.files.get";
pub const AGENTS_FILES_SET: &str = "agents.files.set";
pub const CONFIG_GET: &str = "config.get";
pub const CONFIG_PATCH: &str = "config.patch";
pub const CONFIG_SCHEMA: &str = "config.schema";
pub const STATUS: &str = "status";
pub const HEALTH: &str = "health";
