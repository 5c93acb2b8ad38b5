//! Error types shared across the form engine.

#[derive(Debug, thiserror::Error)]
pub enum FormError {
	#[error("Unknown field: {0}")]
	UnknownField(String),
	#[error("Duplicate field id in schema: {0}")]
	DuplicateField(String),
	#[error("Schema error: {0}")]
	Schema(String),
}

pub type FormResult<T> = Result<T, FormError>;
