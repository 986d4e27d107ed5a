//! Motion commands and their line format on the wire.

use crate::error::ParameterError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pen position for a motion command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PenState {
    /// Lifted, travel only
    Up,
    /// Lowered, drawing
    Down,
}

impl fmt::Display for PenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Integer values the controller expects in the `z:` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenFlags {
    /// Flag sent for a lifted pen
    pub up: u8,
    /// Flag sent for a lowered pen
    pub down: u8,
}

impl Default for PenFlags {
    fn default() -> Self {
        Self { up: 1, down: 0 }
    }
}

impl PenFlags {
    /// Flag value for a pen state
    pub fn flag(&self, pen: PenState) -> u8 {
        match pen {
            PenState::Up => self.up,
            PenState::Down => self.down,
        }
    }
}

/// One controller command: move to `(x_mm, y_mm)` with the given pen state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Target X in mm
    pub x_mm: f64,
    /// Target Y in mm
    pub y_mm: f64,
    /// Pen state during the move
    pub pen: PenState,
}

impl Command {
    /// Pen-up move
    pub const fn up(x_mm: f64, y_mm: f64) -> Self {
        Self {
            x_mm,
            y_mm,
            pen: PenState::Up,
        }
    }

    /// Pen-down move
    pub const fn down(x_mm: f64, y_mm: f64) -> Self {
        Self {
            x_mm,
            y_mm,
            pen: PenState::Down,
        }
    }

    /// Render the controller line `x:XXX.Xy:YYY.Yz:F\n`.
    ///
    /// Coordinates are zero padded to five characters with one decimal;
    /// the controller parser depends on this layout byte for byte.
    pub fn to_line(&self, flags: PenFlags) -> String {
        format!(
            "x:{:05.1}y:{:05.1}z:{}\n",
            self.x_mm,
            self.y_mm,
            flags.flag(self.pen)
        )
    }

    /// Parse a controller line. Trailing whitespace is ignored.
    pub fn parse_line(line: &str, flags: PenFlags) -> Result<Self, ParameterError> {
        let line = line.trim();
        let invalid = |reason: &str| ParameterError::InvalidValue {
            name: "command".to_string(),
            reason: format!("{reason} in {line:?}"),
        };

        let x_pos = line.find("x:").ok_or_else(|| invalid("missing x:"))?;
        let y_pos = line.find("y:").ok_or_else(|| invalid("missing y:"))?;
        let z_pos = line.find("z:").ok_or_else(|| invalid("missing z:"))?;
        if !(x_pos < y_pos && y_pos < z_pos) {
            return Err(invalid("fields out of order"));
        }

        let x_mm: f64 = line[x_pos + 2..y_pos]
            .trim()
            .parse()
            .map_err(|_| invalid("bad x value"))?;
        let y_mm: f64 = line[y_pos + 2..z_pos]
            .trim()
            .parse()
            .map_err(|_| invalid("bad y value"))?;
        let z: u8 = line[z_pos + 2..]
            .trim()
            .parse()
            .map_err(|_| invalid("bad z value"))?;

        let pen = if z == flags.up {
            PenState::Up
        } else if z == flags.down {
            PenState::Down
        } else {
            return Err(invalid("unknown pen flag"));
        };

        Ok(Self { x_mm, y_mm, pen })
    }
}
