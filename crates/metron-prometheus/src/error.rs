use thiserror::Error;

use metron_core::CollectError;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("collection failed: {0}")]
    Collect(#[from] CollectError),

    #[error("prometheus encoding failed: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("encoded output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
