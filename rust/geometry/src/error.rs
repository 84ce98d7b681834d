// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Matrix is singular and cannot be inverted")]
    SingularMatrix,

    #[error("Matrix is not affine: bottom row must be [0, 0, 0, 1]")]
    NotAffine,

    #[error("Vector has zero length")]
    ZeroLengthVector,

    #[error("Degenerate polygon: {0}")]
    DegeneratePolygon(String),

    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Transformation is not representable: {0}")]
    NotRepresentable(String),
}
