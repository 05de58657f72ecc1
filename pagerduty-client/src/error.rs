use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("invalid PagerDuty API url: {0}")]
    Url(#[from] url::ParseError),
    #[error("calling the PagerDuty API failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("PagerDuty API responded with {status}: {error}")]
    Api { status: StatusCode, error: ApiErrorObject },
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            ClientError::Url(_) => None,
        }
    }
}

/// The `error` object of a PagerDuty error document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorObject {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub message: String,
    #[serde(default, deserialize_with = "crate::serde_ext::null_as_default")]
    pub errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDocument {
    pub(crate) error: ApiErrorObject,
}

impl fmt::Display for ApiErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "no error details")?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(code) = self.code {
            write!(f, " (code {code})")?;
        }
        if !self.errors.is_empty() {
            write!(f, ": {}", self.errors.join("; "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_error_document() {
        let doc: ApiErrorDocument = serde_json::from_str(
            r#"{"error":{"code":2001,"message":"Invalid Input Provided","errors":["Limit must be <= 100"]}}"#,
        )
        .unwrap();

        assert_eq!(doc.error.code, Some(2001));
        assert_eq!(
            doc.error.to_string(),
            "Invalid Input Provided (code 2001): Limit must be <= 100"
        );
    }

    #[test]
    fn empty_error_object_still_renders() {
        assert_eq!(ApiErrorObject::default().to_string(), "no error details");
    }
}
