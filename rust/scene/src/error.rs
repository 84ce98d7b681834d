// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for scene translation.

use thiserror::Error;

/// Result type alias for scene operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that leave a translator entry point.
///
/// Problems with single objects are logged and skipped instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] bem_lite_geometry::Error),

    #[error("Model error: {0}")]
    Model(#[from] bem_lite_model::Error),

    #[error("Unsupported scene format: {0}")]
    UnsupportedFormat(String),
}
