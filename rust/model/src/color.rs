// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Display colors for zones, stories, units, space types and constructions.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::handle::Handle;

/// An RGBA display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderingColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl RenderingColor {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses `#RRGGBB` or the `#RGB` shorthand.
    pub fn from_color_string(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(invalid()),
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// `#RRGGBB`, upper case; alpha is not encoded.
    pub fn color_string(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Packed `0xRRGGBB`.
    pub fn to_rgb(&self) -> u32 {
        65536 * self.r as u32 + 256 * self.g as u32 + self.b as u32
    }

    /// Stable color derived from an object's handle.
    pub fn from_handle(handle: &Handle) -> Self {
        let bytes = handle.as_bytes();
        // keep away from near-black and near-white so faces stay readable
        let scale = |b: u8| 40 + (b as u16 * 176 / 255) as u8;
        Self::new(scale(bytes[0]), scale(bytes[5]), scale(bytes[10]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_strings_round_trip() {
        let c = RenderingColor::from_color_string("#CC9933").unwrap();
        assert_eq!(c, RenderingColor::new(0xCC, 0x99, 0x33));
        assert_eq!(c.color_string(), "#CC9933");
        assert_eq!(c.to_rgb(), 0xCC9933);
    }

    #[test]
    fn shorthand_expands() {
        let c = RenderingColor::from_color_string("#c93").unwrap();
        assert_eq!(c, RenderingColor::new(0xCC, 0x99, 0x33));
    }

    #[test]
    fn invalid_strings_are_rejected() {
        for s in ["CC9933", "#CC99", "#GG9933", ""] {
            assert!(RenderingColor::from_color_string(s).is_err(), "{s}");
        }
    }

    #[test]
    fn handle_colors_are_stable() {
        let h = Handle::new();
        assert_eq!(RenderingColor::from_handle(&h), RenderingColor::from_handle(&h));
    }
}
