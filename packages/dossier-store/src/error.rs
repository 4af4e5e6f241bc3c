#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error("Store request failed with status {status}: {detail}")]
	Api { status: u16, detail: String },
	#[error("Invalid store request: {0}")]
	InvalidRequest(String),
	#[error("Unexpected store response: {0}")]
	InvalidResponse(String),
}
