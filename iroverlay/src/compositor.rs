/*!
Upsampling, stale-frame retention and alpha blending.

The compositor owns the "last known good frame": the most recent false-color
image, upsampled to display resolution. Ticks without a new thermal frame
reuse it unchanged; before the first valid frame ever arrives there is no
thermal layer and the visual frame passes through untouched.
*/

use image::imageops::{self, FilterType};
use image::RgbImage;
use tracing::debug;

/// Per-tick image compositor.
///
/// State machine across ticks: no thermal layer until the first valid frame,
/// then holding, with the held image replaced on each subsequent valid frame.
pub struct Compositor {
    thermal_weight: f32,
    last_known: Option<RgbImage>,
}

impl Compositor {
    /// Create a compositor blending the thermal layer at `thermal_weight`
    /// (the visual frame gets the complementary weight)
    pub fn new(thermal_weight: f32) -> Self {
        Self {
            thermal_weight: thermal_weight.clamp(0.0, 1.0),
            last_known: None,
        }
    }

    /// Whether a valid thermal frame has ever been composited
    pub fn has_thermal_layer(&self) -> bool {
        self.last_known.is_some()
    }

    /// Composite one tick.
    ///
    /// `fresh` is this tick's newly mapped 32x32 false-color image, if the
    /// synchronizer produced one; it is upsampled to the visual frame's
    /// resolution with bilinear interpolation and becomes the new held
    /// layer. Without a thermal layer the visual frame is returned
    /// unchanged (first-tick policy).
    pub fn composite(&mut self, visual: &RgbImage, fresh: Option<&RgbImage>) -> RgbImage {
        let (width, height) = visual.dimensions();

        if let Some(false_color) = fresh {
            self.last_known = Some(imageops::resize(
                false_color,
                width,
                height,
                FilterType::Triangle,
            ));
        }

        match &self.last_known {
            Some(thermal) if thermal.dimensions() == (width, height) => {
                blend(visual, thermal, self.thermal_weight)
            }
            Some(thermal) => {
                // The visual source contract is stable dimensions; tolerate
                // a change by rescaling the held layer once
                debug!(
                    "visual resolution changed to {}x{}, rescaling held thermal layer",
                    width, height
                );
                let rescaled = imageops::resize(thermal, width, height, FilterType::Triangle);
                let out = blend(visual, &rescaled, self.thermal_weight);
                self.last_known = Some(rescaled);
                out
            }
            None => visual.clone(),
        }
    }
}

/// Weighted per-pixel average of two same-sized images
pub fn blend(base: &RgbImage, overlay: &RgbImage, overlay_weight: f32) -> RgbImage {
    debug_assert_eq!(base.dimensions(), overlay.dimensions());

    let base_weight = 1.0 - overlay_weight;
    let mut out = RgbImage::new(base.width(), base.height());
    for (o, (b, t)) in out
        .pixels_mut()
        .zip(base.pixels().zip(overlay.pixels()))
    {
        for c in 0..3 {
            let mixed = b.0[c] as f32 * base_weight + t.0[c] as f32 * overlay_weight;
            o.0[c] = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn flat(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    #[test]
    fn test_blend_equal_weights() {
        let black = flat(4, 4, 0);
        let white = flat(4, 4, 255);
        let out = blend(&black, &white, 0.5);
        // 0 * 0.5 + 255 * 0.5 = 127.5, rounds to 128
        assert_eq!(*out.get_pixel(0, 0), Rgb([128, 128, 128]));
    }

    #[test]
    fn test_blend_weight_extremes() {
        let base = flat(2, 2, 10);
        let overlay = flat(2, 2, 200);
        assert_eq!(*blend(&base, &overlay, 0.0).get_pixel(0, 0), Rgb([10, 10, 10]));
        assert_eq!(*blend(&base, &overlay, 1.0).get_pixel(0, 0), Rgb([200, 200, 200]));
    }

    #[test]
    fn test_first_tick_without_thermal_layer_passes_visual_through() {
        let mut compositor = Compositor::new(0.5);
        let visual = flat(64, 48, 90);

        let out = compositor.composite(&visual, None);
        assert_eq!(out, visual);
        assert!(!compositor.has_thermal_layer());
    }

    #[test]
    fn test_fresh_frame_replaces_held_layer() {
        let mut compositor = Compositor::new(0.5);
        let visual = flat(64, 48, 0);

        let warm = flat(32, 32, 200);
        let first = compositor.composite(&visual, Some(&warm));
        assert!(compositor.has_thermal_layer());
        // A flat overlay upsamples to the same flat value everywhere
        assert_eq!(*first.get_pixel(10, 10), Rgb([100, 100, 100]));

        let hot = flat(32, 32, 240);
        let second = compositor.composite(&visual, Some(&hot));
        assert_eq!(*second.get_pixel(10, 10), Rgb([120, 120, 120]));
    }

    #[test]
    fn test_stale_layer_is_reused_byte_for_byte() {
        let mut compositor = Compositor::new(0.5);
        let visual = flat(64, 48, 30);

        let fresh = flat(32, 32, 180);
        let reference = compositor.composite(&visual, Some(&fresh));

        for _ in 0..5 {
            let stale = compositor.composite(&visual, None);
            assert_eq!(stale.as_raw(), reference.as_raw());
        }
    }
}
