// NUFLIX Speedcode - Cycle-exact raster code generation for the Commodore 64
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Error types for the speedcode generator.
//!
//! Only conditions that make the generated code unusable are errors.
//! Everything the hardware budget merely could not accommodate (unresolved
//! rows, dropped deferred writes, oversized code) is reported through
//! [`crate::codegen::Diagnostics`] instead.

use std::io;
use thiserror::Error;

/// Error codes for the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Input errors (E001-E009)
    InvalidFrame,
    InvalidUpdatePlan,

    // Emission errors (E010-E019)
    MissingSlowValue,

    // Timing patch errors (E020-E029)
    UnsupportedDelay,
    RunLengthTooLong,
    PatchOutOfBounds,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::InvalidFrame => "E001",
            ErrorCode::InvalidUpdatePlan => "E002",
            ErrorCode::MissingSlowValue => "E010",
            ErrorCode::UnsupportedDelay => "E020",
            ErrorCode::RunLengthTooLong => "E021",
            ErrorCode::PatchOutOfBounds => "E022",
        }
    }
}

/// A generator error.
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct CodegenError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Optional hint for fixing the error.
    pub hint: Option<String>,
}

impl CodegenError {
    /// Create a new generator error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: None,
        }
    }

    /// Add a hint to this error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Get the error code string.
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }
}

/// Result type for generator operations.
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Errors raised while loading input files.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The file could not be read.
    #[error("Cannot read input: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid JSON for the expected structure.
    #[error("Malformed input: {0}")]
    Json(#[from] serde_json::Error),

    /// The file parsed but describes something the generator cannot use.
    #[error("{0}")]
    Invalid(#[from] CodegenError),
}

/// Format an error for terminal output.
pub fn format_error(error: &CodegenError) -> String {
    let mut output = format!("error[{}]: {}\n", error.code_str(), error.message);
    if let Some(hint) = &error.hint {
        output.push_str(&format!("  = hint: {}\n", hint));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(ErrorCode::InvalidFrame.code(), "E001");
        assert_eq!(ErrorCode::MissingSlowValue.code(), "E010");
        assert_eq!(ErrorCode::UnsupportedDelay.code(), "E020");
    }

    #[test]
    fn test_codegen_error_display() {
        let error = CodegenError::new(ErrorCode::UnsupportedDelay, "Unsupported adjustment delay: 5");
        assert_eq!(error.to_string(), "[E020] Unsupported adjustment delay: 5");
        assert!(error.hint.is_none());
    }

    #[test]
    fn test_format_error_with_hint() {
        let error = CodegenError::new(ErrorCode::MissingSlowValue, "No slow encoding for $68")
            .with_hint("Add the value to the slow value table");
        let text = format_error(&error);
        assert!(text.starts_with("error[E010]: No slow encoding for $68\n"));
        assert!(text.contains("= hint: Add the value to the slow value table"));
    }

    #[test]
    fn test_frame_error_from_codegen_error() {
        let error: FrameError = CodegenError::new(ErrorCode::InvalidFrame, "bad").into();
        assert_eq!(error.to_string(), "[E001] bad");
    }
}
