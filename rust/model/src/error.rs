// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for model operations.

use crate::handle::Handle;
use crate::keys::{ObjectKey, ObjectType};

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during model operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No object with this handle exists in the model.
    #[error("object not found: {0}")]
    NotFound(Handle),

    /// The key does not refer to a live object.
    #[error("object key not found: {0:?}")]
    KeyNotFound(ObjectKey),

    /// The object exists but is of another type.
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: ObjectType,
    },

    /// An object with this handle already exists.
    #[error("duplicate handle: {0}")]
    DuplicateHandle(Handle),

    /// A coordinate group can only hold yaw plus translation.
    #[error("unsupported transformation: {0}")]
    UnsupportedTransformation(String),

    /// A string did not name a known enumeration value.
    #[error("unknown {kind} '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    /// A color string was not `#RGB` or `#RRGGBB`.
    #[error("invalid color string '{0}'")]
    InvalidColor(String),

    /// A feature is missing from the feature bag.
    #[error("feature not found: {0}")]
    FeatureNotFound(String),

    /// A feature was read with the wrong type.
    #[error("feature '{name}' is {found}, not {expected}")]
    FeatureType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Geometry failure.
    #[error("geometry error: {0}")]
    Geometry(#[from] bem_lite_geometry::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
