//! Blocking HTTP transport.
//!
//! Uses async reqwest on an owned tokio runtime, but presents a sync
//! interface so rayon workers can call it directly.

use std::time::Duration;

use crate::error::FetchError;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Query string parameters as ordered key/value pairs
pub type Params = [(&'static str, String)];

/// Anything that can perform a single GET and return the body as text.
///
/// A single attempt only; retries live in [`RetryingFetcher`](crate::RetryingFetcher).
pub trait Transport: Sync {
    fn get(&self, url: &str, params: &Params, timeout: Duration) -> Result<String, FetchError>;
}

/// reqwest-backed transport with connection pooling.
///
/// Construct once per run and pass by reference.
pub struct HttpTransport {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new() -> std::io::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(8)
            .user_agent(concat!("ratingline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(std::io::Error::other)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        Ok(Self { client, runtime })
    }

    /// Underlying client, for callers that need more than plain GET (e.g. the Sheets backend)
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Run a future to completion on the transport's runtime
    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, params: &Params, timeout: Duration) -> Result<String, FetchError> {
        self.runtime.block_on(async {
            let resp = self
                .client
                .get(url)
                .query(params)
                .timeout(timeout)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(FetchError::from_reqwest)?;
            resp.text().await.map_err(FetchError::from_reqwest)
        })
    }
}
