//! Transport boundary helpers.
//!
//! Commands arrive as a method name plus positional string parameters.
//! [`convert::convert_values`] turns the positions its static table lists
//! into typed JSON values, and [`order_history::query_from_params`] maps the
//! converted `dxGetOrderHistory` parameters onto a [`crate::models::Query`].

pub mod convert;
pub mod order_history;

use serde_json::json;
use thiserror::Error;

pub use convert::convert_values;
pub use order_history::query_from_params;

/// Error code xrouter clients expect for malformed parameters.
pub const XROUTER_INVALID_PARAMETERS: i64 = 1025;

/// Method prefix of xrouter commands.
pub const XROUTER_PREFIX: &str = "xr";

/// Which subsystem a command belongs to; decides how errors are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    /// `xr*` commands, answered with a structured error object.
    XRouter,
    /// Everything else, answered with a plain message.
    Core,
}

impl Subsystem {
    /// Subsystem of `method`.
    pub fn of(method: &str) -> Self {
        if method.starts_with(XROUTER_PREFIX) {
            Subsystem::XRouter
        } else {
            Subsystem::Core
        }
    }
}

/// Errors raised at the transport boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    /// A parameter could not be read as the type its position requires.
    #[error("Failed to parse input parameters: {value}, check the docs: help {method}")]
    InvalidParameters {
        /// Command name.
        method: String,
        /// Zero-based parameter position.
        index: usize,
        /// The offending raw value.
        value: String,
        /// Subsystem of the command.
        origin: Subsystem,
    },

    /// Any other request failure.
    #[error("{0}")]
    Request(String),
}

impl RpcError {
    pub(crate) fn invalid(method: &str, index: usize, value: impl Into<String>) -> Self {
        RpcError::InvalidParameters {
            method: method.to_owned(),
            index,
            value: value.into(),
            origin: Subsystem::of(method),
        }
    }

    /// `true` for [`RpcError::InvalidParameters`].
    pub fn is_invalid_parameters(&self) -> bool {
        matches!(self, RpcError::InvalidParameters { .. })
    }

    /// Text sent back to the caller.
    ///
    /// xrouter parameter errors become a pretty-printed
    /// `{"error": .., "code": 1025}` object; everything else is the message.
    pub fn render(&self) -> String {
        match self {
            RpcError::InvalidParameters {
                origin: Subsystem::XRouter,
                ..
            } => {
                let body = json!({
                    "error": self.to_string(),
                    "code": XROUTER_INVALID_PARAMETERS,
                });
                serde_json::to_string_pretty(&body).unwrap_or_else(|_| self.to_string())
            }
            _ => self.to_string(),
        }
    }
}
