//! Transport Errors

use thiserror::Error;

/// Failure talking to the Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Connection, TLS, timeout, or body-decode failure; no API verdict
    /// was obtained.
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with `ok: false`.
    #[error("api error {code}: {description}")]
    Api { code: i32, description: String },

    /// The API answered `ok: true` without a result payload.
    #[error("api response missing result")]
    MissingResult,
}
