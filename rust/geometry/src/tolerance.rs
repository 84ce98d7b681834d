// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Numeric tolerances used across geometry operations.

/// Tolerance bundle passed to operations that compare positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Maximum Euclidean distance at which two points are considered equal (m).
    pub point: f64,
    /// Maximum distance of a vertex from its fitted plane (m).
    pub plane: f64,
    /// Minimum cross-product magnitude of adjacent unit edges to keep a vertex.
    pub collinear: f64,
    /// |z′·Z| above which `align_z_prime` treats z′ as vertical.
    pub align_z_prime_threshold: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            point: 0.01,
            plane: 0.001,
            collinear: 0.001,
            align_z_prime_threshold: 0.99,
        }
    }
}
