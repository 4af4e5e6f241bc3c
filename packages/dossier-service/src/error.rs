pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Upstream {provider} error{}: {detail}", status_suffix(.status))]
	Upstream { provider: &'static str, status: Option<u16>, detail: String },
}

impl Error {
	pub fn validation(message: impl Into<String>) -> Self {
		Self::Validation { message: message.into() }
	}

	pub(crate) fn embedding(err: color_eyre::Report) -> Self {
		Self::Upstream { provider: "embedding", status: None, detail: err.to_string() }
	}

	pub(crate) fn completion(err: color_eyre::Report) -> Self {
		Self::Upstream { provider: "completion", status: None, detail: err.to_string() }
	}
}

impl From<dossier_store::Error> for Error {
	fn from(err: dossier_store::Error) -> Self {
		match err {
			dossier_store::Error::Api { status, detail } =>
				Self::Upstream { provider: "store", status: Some(status), detail },
			dossier_store::Error::Reqwest(inner) => Self::Upstream {
				provider: "store",
				status: inner.status().map(|s| s.as_u16()),
				detail: inner.to_string(),
			},
			dossier_store::Error::InvalidRequest(message) => Self::Validation { message },
			dossier_store::Error::InvalidResponse(detail) =>
				Self::Upstream { provider: "store", status: None, detail },
		}
	}
}

fn status_suffix(status: &Option<u16>) -> String {
	status.map(|s| format!(" (status {s})")).unwrap_or_default()
}
