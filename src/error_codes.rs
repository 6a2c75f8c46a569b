use std::fmt;
use std::path::Path;

use anyhow::Error;
use serde::Serialize;
use serde_json::{json, Value};

pub const IMAGE_LOAD_ERROR: &str = "IMAGE_LOAD_ERROR";
pub const INVALID_GRID: &str = "INVALID_GRID";
pub const ENCODER_WRITE_ERROR: &str = "ENCODER_WRITE_ERROR";
pub const INVALID_CONFIG: &str = "INVALID_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodedErrorKind {
    ImageLoad,
    InvalidGrid,
    EncoderWrite,
    Config,
}

/// A failure from the error taxonomy of an animation run.
///
/// Carried inside `anyhow::Error` so call sites keep using `?` and context
/// chaining; [`find_coded_error`] recovers it at the top level.
#[derive(Debug, Clone)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
    pub kind: CodedErrorKind,
}

impl CodedError {
    pub fn image_load(path: &Path, reason: impl fmt::Display) -> Self {
        Self {
            code: IMAGE_LOAD_ERROR,
            message: format!("failed to load image '{}': {reason}", path.display()),
            details: Some(json!({ "path": path.display().to_string() })),
            kind: CodedErrorKind::ImageLoad,
        }
    }

    pub fn invalid_grid(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_GRID,
            message: message.into(),
            details: None,
            kind: CodedErrorKind::InvalidGrid,
        }
    }

    pub fn encoder_write(path: &Path, reason: impl fmt::Display) -> Self {
        Self {
            code: ENCODER_WRITE_ERROR,
            message: format!("failed to write video '{}': {reason}", path.display()),
            details: Some(json!({ "path": path.display().to_string() })),
            kind: CodedErrorKind::EncoderWrite,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_CONFIG,
            message: message.into(),
            details: None,
            kind: CodedErrorKind::Config,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: self.code.to_owned(),
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
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CodedError>())
}

/// Envelope for any error; uncoded failures are reported as `INTERNAL`.
pub fn envelope_for(error: &Error) -> ErrorEnvelope {
    match find_coded_error(error) {
        Some(coded) => coded.envelope(),
        None => ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: "INTERNAL".to_owned(),
                message: format!("{error:#}"),
                details: None,
            },
        },
    }
}
