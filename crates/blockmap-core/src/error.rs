use std::fmt;

/// Boxed error from an upstream collaborator (HTTP client, decoder, ...).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias used across the core crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Machine-readable error codes for scripts and agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingConfig,
    ConfigParseError,
    UpstreamFetchFailed,
    UpstreamQueryRejected,
    ProjectNotFound,
    LinkEncodeFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingConfig => "E1001",
            Self::ConfigParseError => "E1002",
            Self::UpstreamFetchFailed => "E2001",
            Self::UpstreamQueryRejected => "E2002",
            Self::ProjectNotFound => "E2003",
            Self::LinkEncodeFailed => "E3001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingConfig => "Required configuration missing",
            Self::ConfigParseError => "Config file parse error",
            Self::UpstreamFetchFailed => "Upstream request failed",
            Self::UpstreamQueryRejected => "Upstream rejected the query",
            Self::ProjectNotFound => "Project not found",
            Self::LinkEncodeFailed => "Diagram link encoding failed",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::MissingConfig => {
                Some("Export LINEAR_API_KEY or add it to a .env file in the working directory.")
            }
            Self::ConfigParseError => Some("Fix syntax in ~/.config/blockmap/config.toml and retry."),
            Self::UpstreamFetchFailed => Some("Check network access and the API URL, then retry."),
            Self::UpstreamQueryRejected => Some("Verify the API key has read access to the project."),
            Self::ProjectNotFound => Some("Pass the project UUID or slug id shown in the project URL."),
            Self::LinkEncodeFailed => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the core pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required setting (usually an environment variable) is absent.
    #[error("Environment variable \"{key}\" not found.")]
    MissingConfig { key: String },

    /// A config file exists but could not be read or parsed.
    #[error("failed to load config {path}: {reason}")]
    ConfigParse { path: String, reason: String },

    /// Transport-level failure talking to the upstream API.
    #[error("{context}: {source}")]
    Fetch {
        context: String,
        #[source]
        source: BoxError,
    },

    /// The upstream API answered with query errors.
    #[error("upstream query failed: {0}")]
    GraphQl(String),

    #[error("project not found: {project_id}")]
    ProjectNotFound { project_id: String },

    /// The diagram link could not be serialized or compressed.
    #[error("failed to encode diagram link: {0}")]
    Encode(String),
}

impl Error {
    /// Wrap an upstream error with a short description of what was attempted.
    pub fn fetch(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Fetch {
            context: context.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingConfig { .. } => ErrorCode::MissingConfig,
            Self::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Self::Fetch { .. } => ErrorCode::UpstreamFetchFailed,
            Self::GraphQl(_) => ErrorCode::UpstreamQueryRejected,
            Self::ProjectNotFound { .. } => ErrorCode::ProjectNotFound,
            Self::Encode(_) => ErrorCode::LinkEncodeFailed,
        }
    }
}
