//! Error types for the buzzer binary.
//!
//! [`AppError`] wraps every failure mode of start-up and the run modes
//! so that `main` can propagate with `?`.

/// Top-level error for the buzzer binary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: buzzer_core::ConfigError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: buzzer_api::ServerError,
    },

    /// The load generator could not be set up.
    #[error("load generator error: {source}")]
    Load {
        /// The underlying load generator error.
        #[from]
        source: buzzer_loadgen::LoadError,
    },

    /// A background task panicked or was cancelled.
    #[error("task error: {source}")]
    Task {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },

    /// Reading the console failed.
    #[error("console I/O error: {source}")]
    Console {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
