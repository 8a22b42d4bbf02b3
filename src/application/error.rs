use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{catalog::CatalogError, library::LibraryError},
    infra::error::InfraError,
};

/// Flattened view of an error and its source chain, used when reporting.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn chain(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code for the command-line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Infra(InfraError::Configuration { .. }) => 78,
            AppError::Catalog(_) | AppError::Library(_) => 69,
            AppError::Infra(InfraError::Output { .. }) => 74,
            AppError::Infra(InfraError::Telemetry(_))
            | AppError::Infra(InfraError::HttpClient { .. })
            | AppError::Unexpected(_) => 1,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}
