use crate::value::ConversionError;
use thiserror::Error;

/// Why one directive was skipped. Never fatal to the rest of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Resolution(String),
    #[error("Could not convert value: {0}")]
    Conversion(#[from] ConversionError),
    #[error("{0}")]
    Application(String),
}

impl DirectiveError {
    pub fn resolution(message: impl Into<String>) -> Self {
        DirectiveError::Resolution(message.into())
    }

    pub fn application(message: impl Into<String>) -> Self {
        DirectiveError::Application(message.into())
    }

    pub fn class(&self) -> &'static str {
        match self {
            DirectiveError::Parse(_) => "parse",
            DirectiveError::Resolution(_) => "resolution",
            DirectiveError::Conversion(_) => "conversion",
            DirectiveError::Application(_) => "application",
        }
    }
}

impl From<anyhow::Error> for DirectiveError {
    fn from(err: anyhow::Error) -> Self {
        DirectiveError::Application(format!("{err:#}"))
    }
}

pub type DirectiveResult<T> = Result<T, DirectiveError>;
