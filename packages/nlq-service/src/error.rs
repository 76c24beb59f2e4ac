use serde::Serialize;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Caller-facing failure classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	InvalidInput,
	MalformedResponse,
	UpstreamUnavailable,
	Internal,
}
impl ErrorKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::InvalidInput => "INVALID_INPUT",
			Self::MalformedResponse => "MALFORMED_RESPONSE",
			Self::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
			Self::Internal => "INTERNAL",
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid input: {message}")]
	InvalidInput { message: String },
	#[error("Malformed response: {message}")]
	MalformedResponse { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Vector index error: {message}")]
	Index { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Internal error: {message}")]
	Internal { message: String },
}
impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::InvalidInput { .. } => ErrorKind::InvalidInput,
			Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
			Self::Provider { .. } | Self::Index { .. } => ErrorKind::UpstreamUnavailable,
			Self::Storage { .. } | Self::Internal { .. } => ErrorKind::Internal,
		}
	}
}

impl From<nlq_providers::Error> for Error {
	fn from(err: nlq_providers::Error) -> Self {
		if err.is_malformed() {
			return Self::MalformedResponse { message: err.to_string() };
		}

		match err {
			nlq_providers::Error::Reqwest(inner) => Self::Provider { message: inner.to_string() },
			other => Self::Internal { message: other.to_string() },
		}
	}
}

impl From<nlq_storage::Error> for Error {
	fn from(err: nlq_storage::Error) -> Self {
		match err {
			nlq_storage::Error::Qdrant(inner) => Self::Index { message: inner.to_string() },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Index { message: err.to_string() }
	}
}
