//! Ratingline Core - Common infrastructure for rating harvest pipelines
//!
//! HTTP fetching with retry, bounded fan-out, batched tabular upload,
//! logging, progress and shutdown handling.

pub mod error;
pub mod http;
pub mod logging;
pub mod pool;
pub mod progress;
pub mod retry;
pub mod sheets;
pub mod shutdown;
pub mod sink;
pub mod table;

// Re-exports for convenience
pub use error::FetchError;
pub use http::{HttpTransport, Params, Transport};
pub use logging::init_logging;
pub use pool::fan_out;
pub use progress::{ProgressContext, fmt_num};
pub use retry::{RetryPolicy, RetryingFetcher, retry_with_backoff};
pub use sheets::SheetsTable;
pub use shutdown::{
    clear_shutdown, install_signal_handlers, is_shutdown_requested, request_shutdown,
};
pub use sink::{ErrorClass, SheetSink, SinkError, Tabular, UploadPolicy, classify};
pub use table::{JsonlTable, MemoryTable};
