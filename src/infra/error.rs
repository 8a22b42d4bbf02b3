use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to write {target}")]
    Output {
        target: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("metadata client setup failed: {message}")]
    HttpClient { message: String },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn output(target: &'static str, source: std::io::Error) -> Self {
        Self::Output { target, source }
    }

    pub fn http_client(message: impl Into<String>) -> Self {
        Self::HttpClient {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
