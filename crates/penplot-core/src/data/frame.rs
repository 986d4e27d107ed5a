//! Binary pixel grid produced by raster decoding.

use crate::error::RasterError;

/// Binary raster, row-major, one byte per pixel holding 0 (OFF) or 1 (ON)
///
/// Frames built by [`RasterFrame::from_raw`] are not checked for binary
/// content so that frames from external filters can be inspected with
/// [`RasterFrame::validate`] before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl RasterFrame {
    /// Frame with every pixel set to `on`
    pub fn filled(width: usize, height: usize, on: bool) -> Self {
        Self {
            width,
            height,
            data: vec![u8::from(on); width * height],
        }
    }

    /// Build a frame from a predicate over `(x, y)`
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(u8::from(f(x, y)));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap raw values. Only the length is checked.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self, RasterError> {
        if data.len() != width * height {
            return Err(RasterError::InvalidFrame {
                reason: format!(
                    "{} values for a {}x{} frame",
                    data.len(),
                    width,
                    height
                ),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Frame width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw row-major values
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Pixel state; out-of-bounds reads are OFF
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[y * self.width + x] != 0
    }

    /// Set one pixel; out-of-bounds writes are ignored
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = u8::from(on);
        }
    }

    /// Number of ON pixels
    pub fn count_on(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// True when every value is exactly 0 or 1
    pub fn is_binary(&self) -> bool {
        self.data.iter().all(|&v| v <= 1)
    }

    /// Reject empty frames and non-binary content
    pub fn validate(&self) -> Result<(), RasterError> {
        if self.width == 0 || self.height == 0 {
            return Err(RasterError::InvalidFrame {
                reason: format!("non-positive dimensions {}x{}", self.width, self.height),
            });
        }
        if let Some(pos) = self.data.iter().position(|&v| v > 1) {
            return Err(RasterError::InvalidFrame {
                reason: format!(
                    "non-binary value {} at ({}, {})",
                    self.data[pos],
                    pos % self.width,
                    pos / self.width
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn_row_major() {
        let frame = RasterFrame::from_fn(3, 2, |x, y| x == 2 && y == 1);
        assert_eq!(frame.as_slice(), &[0, 0, 0, 0, 0, 1]);
        assert!(frame.get(2, 1));
        assert!(!frame.get(7, 7));
        assert_eq!(frame.count_on(), 1);
    }

    #[test]
    fn test_from_raw_rejects_length_mismatch() {
        assert!(RasterFrame::from_raw(2, 2, vec![0; 3]).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(RasterFrame::filled(0, 4, false).validate().is_err());

        let frame = RasterFrame::from_raw(2, 1, vec![0, 255]).unwrap();
        assert!(!frame.is_binary());
        let err = frame.validate().unwrap_err();
        assert!(err.to_string().contains("non-binary value 255 at (1, 0)"));

        assert!(RasterFrame::filled(4, 4, true).validate().is_ok());
    }
}
