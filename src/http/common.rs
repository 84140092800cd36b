/// Default base URL of a locally running opencode server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:4096";

/// Media type requested for the event stream.
pub const EVENT_STREAM_MEDIA_TYPE: &str = "text/event-stream";

/// Represents the server endpoints this client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Server-Sent-Events bus
    Event,
    ListSessions,
    GetConfig,
    ListAgents,
    ListProjects,
    CurrentProject,
    FileStatus,
    GetPath,
    ConfigProviders,
    ToolIds,
    ListCommands,
}

impl Endpoint {
    /// Constructs the URL path for this endpoint
    pub const fn path(self) -> &'static str {
        match self {
            Self::Event => "/event",
            Self::ListSessions => "/session",
            Self::GetConfig => "/config",
            Self::ListAgents => "/agent",
            Self::ListProjects => "/project",
            Self::CurrentProject => "/project/current",
            Self::FileStatus => "/file/status",
            Self::GetPath => "/path",
            Self::ConfigProviders => "/config/providers",
            Self::ToolIds => "/experimental/tool/ids",
            Self::ListCommands => "/command",
        }
    }
}

/// Constructs the full URL for an endpoint.
///
/// Trailing slashes on `base_url` are ignored. `directory`, when present, is
/// forwarded as a URL-encoded `directory` query parameter.
#[must_use]
pub fn construct_endpoint_url(base_url: &str, endpoint: Endpoint, directory: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    let path = endpoint.path();

    match directory {
        Some(dir) => format!("{base}{path}?directory={}", urlencoding::encode(dir)),
        None => format!("{base}{path}"),
    }
}
