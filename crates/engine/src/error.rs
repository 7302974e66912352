use thiserror::Error;

/// Failures while talking to a model provider or driving the tool loop.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("api error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response from {provider}: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("model kept requesting tools after {0} rounds")]
    ToolRoundLimit(usize),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} not found in environment variables")]
    MissingApiKey { var: &'static str },

    #[error("unknown provider '{0}' (expected 'anthropic' or 'gemini')")]
    UnknownProvider(String),

    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

pub type Result<T, E = AgentError> = std::result::Result<T, E>;
