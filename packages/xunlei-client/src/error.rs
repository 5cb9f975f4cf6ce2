use thiserror::Error;

pub type Result<T> = std::result::Result<T, XunleiError>;

#[derive(Debug, Error)]
pub enum XunleiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered but rejected the request. `status` is the HTTP status
    /// code; for rejections carried in a 200 envelope it is still 200 and the
    /// provider's own message is preserved verbatim in `message`.
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Unexpected(String),

    /// The account has no room left for the restored files. Recognized by the
    /// provider's "capacity limit" marker during task polling; fatal for the
    /// whole transfer, no further polls are attempted.
    #[error("account capacity exhausted")]
    CapacityExceeded,

    #[error("remote task failed: {0}")]
    TaskFailed(String),

    /// The poll budget ran out before the remote task reached a terminal
    /// state. Distinct from `TaskFailed`: the provider never said no.
    #[error("remote task did not complete after {attempts} polls")]
    TaskTimeout { attempts: u32 },
}
