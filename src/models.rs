use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Filesystem locations the server is working with (`GET /path`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathInfo {
    pub state: String,
    pub config: String,
    pub worktree: String,
    pub directory: String,
    /// Fields not known to this version of the client.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
