//! Common error type for page fetches

/// Error from fetching a single page (listing or detail).
///
/// Either an HTTP-level failure (with the status code when the server
/// answered) or a transport failure that never produced a response.
#[derive(Debug)]
pub enum FetchError {
    /// Server answered with a non-success status
    Http { status: u16, message: String },
    /// Request did not complete within its timeout
    Timeout(String),
    /// Connection could not be established or was reset
    Connect(String),
    /// Response body could not be read or decoded
    Body(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::Timeout(m) => write!(f, "timeout: {m}"),
            Self::Connect(m) => write!(f, "connection error: {m}"),
            Self::Body(m) => write!(f, "body error: {m}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Create from a reqwest error, stripping the URL so query strings stay out of logs
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        let (timeout, connect) = (e.is_timeout(), e.is_connect() || e.is_request());
        let message = e.without_url().to_string();
        if let Some(status) = status {
            Self::Http { status, message }
        } else if timeout {
            Self::Timeout(message)
        } else if connect {
            Self::Connect(message)
        } else {
            Self::Body(message)
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Client errors that will not change on retry (bad request, auth,
    /// missing page, gone) are permanent; everything else is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => !matches!(status, 400 | 401 | 403 | 404 | 410),
            Self::Timeout(_) | Self::Connect(_) | Self::Body(_) => true,
        }
    }
}
