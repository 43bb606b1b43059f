/*!
Thermal frame validation, decoding and normalization.

This module provides the core frame data structures used throughout the
pipeline: [`ThermalFrame`] for a validated sensor frame and
[`NormalizedGrid`] for its per-frame rescaled palette indices.
*/

use crate::error::{Result, SharedError};
use crate::protocol::{
    FRAME_LENGTH_BYTES, GRID_SIZE, PAYLOAD_BYTES, PAYLOAD_OFFSET, SAMPLES_PER_FRAME, SIGNATURE,
    TENTHS_PER_DEGREE,
};

/// One validated sensor frame.
///
/// Construction via [`ThermalFrame::from_bytes`] guarantees the signature
/// matched and exactly [`SAMPLES_PER_FRAME`] samples were present, so the
/// decoding methods have no failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThermalFrame {
    samples: Vec<i16>,
}

impl ThermalFrame {
    /// Validate and parse a raw frame candidate.
    ///
    /// The buffer must be exactly [`FRAME_LENGTH_BYTES`] long and start with
    /// the two-byte [`SIGNATURE`]. The payload is 1024 little-endian signed
    /// 16-bit samples in tenths of a degree; the reserved tail bytes are
    /// ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != FRAME_LENGTH_BYTES {
            return Err(SharedError::invalid_frame(format!(
                "expected {} bytes, got {}",
                FRAME_LENGTH_BYTES,
                data.len()
            )));
        }

        if data[0..2] != SIGNATURE {
            return Err(SharedError::invalid_frame(format!(
                "bad signature: {:02X} {:02X}",
                data[0], data[1]
            )));
        }

        let payload = &data[PAYLOAD_OFFSET..PAYLOAD_OFFSET + PAYLOAD_BYTES];
        let samples: Vec<i16> = payload
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        debug_assert_eq!(samples.len(), SAMPLES_PER_FRAME);

        Ok(Self { samples })
    }

    /// Raw fixed-point samples, row-major 32x32
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Decode the payload into temperatures in degrees.
    ///
    /// Each sample is tenths of a degree; output order matches sample order
    /// (row-major 32x32).
    pub fn temperatures(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&s| s as f32 / TENTHS_PER_DEGREE)
            .collect()
    }
}

/// Palette indices derived from one frame's own min/max.
///
/// Indices are always in [0,255]; values from different frames are not
/// comparable since each frame is rescaled against its own range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedGrid {
    indices: Vec<u8>,
}

impl NormalizedGrid {
    /// Rescale a frame's temperatures to palette indices.
    ///
    /// The coldest sample maps to 0, the hottest to 255, linearly in
    /// between. A uniform frame (max == min) maps every sample to 0. The
    /// result is clamped into [0,255] so a rounding excursion can never
    /// produce an out-of-range palette index.
    pub fn from_temperatures(temperatures: &[f32]) -> Self {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &t in temperatures {
            min = min.min(t);
            max = max.max(t);
        }
        let range = max - min;

        let indices = if range > 0.0 {
            temperatures
                .iter()
                .map(|&t| (((t - min) * 255.0 / range).round()).clamp(0.0, 255.0) as u8)
                .collect()
        } else {
            // Uniform scene: defined fallback, not an error
            vec![0u8; temperatures.len()]
        };

        Self { indices }
    }

    /// Palette indices in sample order (row-major 32x32)
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Number of indices in the grid
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if the grid is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Side length of the square grid
    pub fn side(&self) -> usize {
        GRID_SIZE
    }
}
