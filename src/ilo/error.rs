//! Error taxonomy of the iLO client.

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(thiserror::Error, Debug)]
pub enum IloError {
    #[error("Login failed at {url}: HTTP {status}")]
    LoginFailed { url: String, status: u16 },

    #[error("Communication error talking to iLO at {url}. {source}")]
    Communication {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("iLO returned an error at {url}: {message}")]
    Protocol { url: String, message: String },

    #[error("Unknown iLO accessor '{0}'")]
    UnknownAccessor(String),

    #[error("Could not build HTTP client: {0}")]
    ClientSetup(#[source] BoxError),
}

impl IloError {
    /// Login, communication and protocol failures are the normal ways a
    /// remote iLO misbehaves. Everything else points at a bug in the agent.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IloError::LoginFailed { .. } | IloError::Communication { .. } | IloError::Protocol { .. }
        )
    }

    pub(crate) fn communication(url: &str, source: impl Into<BoxError>) -> Self {
        IloError::Communication {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn protocol(url: &str, message: impl Into<String>) -> Self {
        IloError::Protocol {
            url: url.to_string(),
            message: message.into(),
        }
    }
}
