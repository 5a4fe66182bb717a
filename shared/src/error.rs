use serde_json::Value;
use thiserror::Error;

/// The four backend calls the client performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    CreateProblem,
    ListProblems,
    ListCategories,
}

impl Operation {
    /// Message shown when the backend gives no usable detail.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Self::Login => "Login failed. Check your credentials.",
            Self::CreateProblem => "Could not submit the problem.",
            Self::ListProblems => "Could not load problems.",
            Self::ListCategories => "Could not load categories.",
        }
    }

    pub fn error(self, message: impl Into<String>) -> ApiError {
        let message = message.into();
        match self {
            Self::Login => ApiError::Auth(message),
            Self::CreateProblem => ApiError::Submission(message),
            Self::ListProblems | Self::ListCategories => ApiError::Fetch(message),
        }
    }

    /// The operation's error carrying its fallback message.
    pub fn fallback_error(self) -> ApiError {
        self.error(self.fallback_message())
    }
}

/// A failed backend call. `Display` is exactly the user-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Submission(String),
    #[error("{0}")]
    Fetch(String),
}

impl ApiError {
    pub fn message(&self) -> &str {
        match self {
            Self::Auth(m) | Self::Submission(m) | Self::Fetch(m) => m,
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Accepts `{"detail": "..."}` and the validation shape
/// `{"detail": [{"msg": "...", ...}, ...]}`, using the first message.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let detail = value.get("detail")?;
    let message = match detail {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))?
            .trim()
            .to_string(),
        _ => return None,
    };
    (!message.is_empty()).then_some(message)
}

/// Convert a non-success response body into the operation's error.
pub fn normalize_failure(op: Operation, body: &str) -> ApiError {
    match extract_detail(body) {
        Some(detail) => op.error(detail),
        None => op.fallback_error(),
    }
}

/// Client-side validation failures of the report form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Description is required.")]
    MissingDescription,
    #[error("Choose a category.")]
    MissingCategory,
    #[error("Location is not available yet.")]
    MissingLocation,
    #[error("Photo must be a JPEG or PNG image.")]
    UnsupportedPhoto,
    #[error("Photo must be at most 5 MB.")]
    PhotoTooLarge,
    #[error("Enter your CPF and password.")]
    MissingCredentials,
}
