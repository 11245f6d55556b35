//! Stable machine-readable failure codes for `--json` output.

use std::fmt;

use anyhow::Error;
use serde::Serialize;
use serde_json::Value;

pub const INVALID_HASH: &str = "INVALID_HASH";
pub const HASH_NOT_FOUND: &str = "HASH_NOT_FOUND";
pub const INVALID_CONFIG: &str = "INVALID_CONFIG";
pub const EMPTY_POOL: &str = "EMPTY_POOL";
pub const UPSTREAM: &str = "UPSTREAM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodedErrorKind {
    /// Caller supplied bad input.
    Usage,
    /// A collaborator (source, filesystem) failed.
    Upstream,
}

#[derive(Debug, Clone)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
    pub kind: CodedErrorKind,
}

impl CodedError {
    pub fn usage(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            kind: CodedErrorKind::Usage,
        }
    }

    pub fn upstream(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: CodedErrorKind::Upstream,
            ..Self::usage(code, message)
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: self.code.to_owned(),
                kind: self.kind,
                message: self.message.clone(),
                details: self.details.clone(),
            },
        }
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub kind: CodedErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CodedError>())
}

/// Envelope for any error: the first coded cause, or a generic
/// `INTERNAL` body carrying the full chain.
pub fn envelope_for(error: &Error) -> ErrorEnvelope {
    match find_coded_error(error) {
        Some(coded) => {
            let mut envelope = coded.envelope();
            envelope.error.message = format!("{error:#}");
            envelope
        }
        None => ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: "INTERNAL".to_owned(),
                kind: CodedErrorKind::Upstream,
                message: format!("{error:#}"),
                details: None,
            },
        },
    }
}
