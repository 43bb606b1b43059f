/*!
# Shared Types and Utilities

This crate contains the sensor-protocol types shared between the IR overlay
components: frame validation and temperature decoding, per-frame range
normalization, and the false-color palette.

## Core Types

- [`ThermalFrame`] - one validated sensor frame (1024 temperature samples)
- [`NormalizedGrid`] - per-frame min/max rescaled palette indices
- [`PaletteTable`] - 256-entry heat gradient lookup table

## Modules

- [`frame`] - frame validation, decoding and normalization
- [`palette`] - color lookup table and false-color mapping
- [`error`] - common error types
*/

pub mod error;
pub mod frame;
pub mod palette;

// Re-export commonly used types
pub use error::{Result, SharedError};
pub use frame::{NormalizedGrid, ThermalFrame};
pub use palette::PaletteTable;

/// Version information for the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol constants for the thermal sensor byte stream
pub mod protocol {
    /// Total length of one frame on the wire, signature + payload + reserved tail
    pub const FRAME_LENGTH_BYTES: usize = 2064;

    /// Two-byte frame signature
    pub const SIGNATURE: [u8; 2] = [0xFE, 0x32];

    /// Offset of the temperature payload within a frame
    pub const PAYLOAD_OFFSET: usize = 2;

    /// Payload size in bytes (1024 little-endian i16 samples)
    pub const PAYLOAD_BYTES: usize = 2048;

    /// Temperature samples per frame
    pub const SAMPLES_PER_FRAME: usize = 1024;

    /// Side length of the square sensor grid
    pub const GRID_SIZE: usize = 32;

    /// Samples are fixed-point tenths of a degree
    pub const TENTHS_PER_DEGREE: f32 = 10.0;

    /// Number of entries in the color lookup table
    pub const PALETTE_ENTRIES: usize = 256;
}
