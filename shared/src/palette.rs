/*!
Color lookup table and false-color mapping.

The heat gradient is an immutable configuration asset: a fixed table of 256
RRGGBB hex entries, parsed and validated once at startup into a
[`PaletteTable`]. Index 0 is the coolest relative value, 255 the hottest.
*/

use crate::error::{Result, SharedError};
use crate::frame::NormalizedGrid;
use crate::protocol::{GRID_SIZE, PALETTE_ENTRIES};
use image::{Rgb, RgbImage};
use tracing::debug;

/// Built-in heat gradient, coolest to hottest, as RRGGBB hex entries
const HEAT_GRADIENT_HEX: [&str; PALETTE_ENTRIES] = [
    "FFFEFB", "FFFCEC", "FFFAE1", "FFF8D6", "FFF7CC", "FFF5C1", "FFF3B6", "FFF2AE",
    "FFF0A2", "FFEE9A", "FFED90", "FFEB88", "FFEA80", "FFE97A", "FFE871", "FFE66A",
    "FFE562", "FFE45C", "FFE355", "FFE250", "FFE14A", "FFE045", "FFDF3F", "FFDF3A",
    "FFDE35", "FFDD31", "FFDC2E", "FFDC2A", "FFDB27", "FFDB23", "FFDA21", "FFDA1D",
    "FFD91C", "FFD91A", "FFD918", "FFD916", "FFD815", "FFD814", "FFD814", "FFD813",
    "FFD813", "FFD813", "FFD713", "FED613", "FED513", "FED413", "FED313", "FED213",
    "FDD114", "FDD014", "FDCF14", "FDCF14", "FDCE14", "FCCD14", "FCCC14", "FCCB14",
    "FCCA14", "FCC914", "FBC814", "FBC814", "FBC614", "FBC514", "FBC514", "FAC415",
    "FAC315", "FAC215", "FAC115", "F9C015", "F9BF15", "F9BE15", "F9BD15", "F9BC15",
    "F8BB15", "F8BB15", "F8BA15", "F8B915", "F8B815", "F7B716", "F7B616", "F7B516",
    "F7B416", "F7B316", "F6B216", "F6B216", "F6B016", "F6AE16", "F5AB16", "F5A916",
    "F5A717", "F4A517", "F4A317", "F4A017", "F39E17", "F39C17", "F39917", "F39718",
    "F29518", "F29318", "F29118", "F18E18", "F18C18", "F18918", "F08719", "F08519",
    "F08319", "F08119", "EF7E19", "EF7C19", "EF7919", "EE771A", "EE751A", "EE731A",
    "ED711A", "ED6E1A", "ED6C1A", "EC691A", "EC671B", "EC651B", "EC631B", "EB611B",
    "EB5E1B", "EB5C1B", "EA5A1B", "EA581C", "EA551C", "E9531C", "E9501C", "E94E1C",
    "E94C1C", "E84A1C", "E8471D", "E8461D", "E7431D", "E7411E", "E63F21", "E43D24",
    "E43C27", "E23A2B", "E1392E", "E03731", "DF3634", "DD3448", "DC323B", "DB313E",
    "DA2F41", "D92E44", "D82C48", "D72B4A", "D5294F", "D42751", "D32655", "D22458",
    "D1225B", "D0215F", "CE1F63", "CD1D65", "CC1C69", "CB1A6C", "CA196F", "C91772",
    "C71576", "C61479", "C5127C", "C41080", "C30F82", "C20D86", "C10C88", "BF0A8C",
    "BE0890", "BD0793", "BC0597", "BA039A", "B9029D", "B901A0", "B500A1", "B300A0",
    "B000A0", "AD009F", "A9009F", "A7009E", "A3009E", "A0009D", "9D009D", "9A009C",
    "97009C", "94009B", "91009B", "8D009A", "8B009A", "870099", "840099", "810098",
    "7E0098", "7B0097", "780097", "750096", "710096", "6F0095", "6C0095", "690094",
    "660094", "620093", "600093", "5D0092", "5A0092", "570091", "530091", "500090",
    "4E0090", "4A008F", "47008F", "44008E", "41008E", "3E008D", "3B008C", "390088",
    "380086", "370083", "35007F", "34007C", "320078", "310075", "300072", "2E006E",
    "2D006B", "2B0068", "2A0064", "290061", "27005D", "26005A", "240056", "230053",
    "220050", "20004D", "1E0049", "1D0046", "1C0042", "1A003F", "19003B", "180038",
    "160034", "150032", "13002E", "12002B", "100027", "0F0024", "0E0021", "0C001D",
    "0B001A", "090015", "080013", "060010", "05000D", "040009", "020006", "010002",
];

/// Immutable 256-entry color lookup table.
///
/// Always holds exactly [`PALETTE_ENTRIES`] colors; construction fails
/// otherwise, so lookups by `u8` index can never go out of bounds.
#[derive(Debug, Clone)]
pub struct PaletteTable {
    entries: Vec<Rgb<u8>>,
}

impl PaletteTable {
    /// Parse a palette from RRGGBB hex entries.
    ///
    /// Rejects anything other than exactly 256 well-formed 6-hex-digit
    /// entries.
    pub fn from_hex_entries(entries: &[&str]) -> Result<Self> {
        if entries.len() != PALETTE_ENTRIES {
            return Err(SharedError::invalid_palette(format!(
                "expected {} entries, got {}",
                PALETTE_ENTRIES,
                entries.len()
            )));
        }

        let mut parsed = Vec::with_capacity(PALETTE_ENTRIES);
        for (i, entry) in entries.iter().enumerate() {
            let bytes = hex::decode(entry)
                .map_err(|e| SharedError::invalid_palette(format!("entry {}: {}", i, e)))?;
            let rgb: [u8; 3] = bytes.as_slice().try_into().map_err(|_| {
                SharedError::invalid_palette(format!(
                    "entry {} has {} bytes, expected 3",
                    i,
                    bytes.len()
                ))
            })?;
            parsed.push(Rgb(rgb));
        }

        debug!("validated {} palette entries", parsed.len());
        Ok(Self { entries: parsed })
    }

    /// Load and validate the built-in heat gradient
    pub fn builtin() -> Result<Self> {
        Self::from_hex_entries(&HEAT_GRADIENT_HEX)
    }

    /// Pure table lookup; total over all `u8` indices
    pub fn lookup(&self, index: u8) -> Rgb<u8> {
        self.entries[index as usize]
    }

    /// Number of palette entries (always 256)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// A valid palette is never empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map a normalized grid through the table into a 32x32 false-color image.
    ///
    /// Pure per-pixel lookup; pixel (x, y) takes the color of sample
    /// `y * 32 + x` (row-major, matching sample order).
    pub fn false_color(&self, grid: &NormalizedGrid) -> RgbImage {
        debug_assert_eq!(grid.len(), GRID_SIZE * GRID_SIZE);

        let side = GRID_SIZE as u32;
        let mut img = RgbImage::new(side, side);
        for (i, &index) in grid.indices().iter().enumerate() {
            let x = (i % GRID_SIZE) as u32;
            let y = (i / GRID_SIZE) as u32;
            img.put_pixel(x, y, self.lookup(index));
        }
        img
    }
}
