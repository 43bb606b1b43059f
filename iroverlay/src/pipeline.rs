/*!
Per-tick pipeline orchestration.

One tick runs Synchronizer -> Decoder -> Normalizer -> Color Mapper ->
Compositor in order, single-threaded. A tick never aborts the loop:
transport errors and malformed frames degrade to stale-frame reuse, and
only startup failures are fatal to the process.
*/

use image::RgbImage;
use tracing::warn;

use crate::compositor::Compositor;
use crate::frame_sync::{FrameSynchronizer, SyncOutcome};
use crate::transport::ByteSource;
use shared::{NormalizedGrid, PaletteTable};

/// The thermal acquisition and rendering pipeline
pub struct Pipeline {
    sync: FrameSynchronizer,
    palette: PaletteTable,
    compositor: Compositor,
}

impl Pipeline {
    /// Create a pipeline with a validated palette and thermal blend weight
    pub fn new(palette: PaletteTable, thermal_weight: f32) -> Self {
        Self {
            sync: FrameSynchronizer::new(),
            palette,
            compositor: Compositor::new(thermal_weight),
        }
    }

    /// Run one tick against the sensor byte source and the externally
    /// annotated visual frame, producing the display composite.
    ///
    /// Infallible by design: a failed read or rejected frame candidate
    /// leaves the held thermal layer in place for this tick.
    pub fn tick(&mut self, source: &mut dyn ByteSource, visual: &RgbImage) -> RgbImage {
        let fresh = match self.sync.try_sync(source) {
            Ok(SyncOutcome::Valid(frame)) => {
                let grid = NormalizedGrid::from_temperatures(&frame.temperatures());
                Some(self.palette.false_color(&grid))
            }
            Ok(SyncOutcome::NoFrame) => None,
            Err(e) => {
                warn!("sensor read failed, keeping held frame: {}", e);
                None
            }
        };

        self.compositor.composite(visual, fresh.as_ref())
    }

    /// Synchronizer statistics: (frames completed, short reads, signature errors)
    pub fn stats(&self) -> (u64, u64, u64) {
        self.sync.stats()
    }

    /// Whether a valid thermal frame has ever been composited
    pub fn has_thermal_layer(&self) -> bool {
        self.compositor.has_thermal_layer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ReplaySource;
    use image::Rgb;
    use shared::protocol::{
        FRAME_LENGTH_BYTES, PAYLOAD_OFFSET, SAMPLES_PER_FRAME, SIGNATURE,
    };

    /// Wire bytes for one valid frame with the given sample values (tenths)
    fn frame_bytes(samples: &[i16]) -> Vec<u8> {
        assert!(samples.len() <= SAMPLES_PER_FRAME);
        let mut data = vec![0u8; FRAME_LENGTH_BYTES];
        data[0] = SIGNATURE[0];
        data[1] = SIGNATURE[1];
        for (i, s) in samples.iter().enumerate() {
            let le = s.to_le_bytes();
            data[PAYLOAD_OFFSET + i * 2] = le[0];
            data[PAYLOAD_OFFSET + i * 2 + 1] = le[1];
        }
        data
    }

    fn test_pipeline() -> Pipeline {
        Pipeline::new(PaletteTable::builtin().unwrap(), 0.5)
    }

    #[test]
    fn test_first_tick_without_any_frame_is_defined() {
        let mut pipeline = test_pipeline();
        let mut source = ReplaySource::from_bytes(Vec::new(), FRAME_LENGTH_BYTES);
        let visual = RgbImage::from_pixel(64, 48, Rgb([77, 77, 77]));

        // No prior valid frame: composite is the visual frame unchanged
        let out = pipeline.tick(&mut source, &visual);
        assert_eq!(out, visual);
        assert!(!pipeline.has_thermal_layer());
    }

    #[test]
    fn test_stale_frame_retention_across_no_frame_ticks() {
        let mut pipeline = test_pipeline();
        let visual = RgbImage::from_pixel(64, 48, Rgb([40, 80, 120]));

        // One valid frame spanning 10.0 to 30.0 degrees, then silence
        let mut samples = vec![200i16; SAMPLES_PER_FRAME];
        samples[0] = 100;
        samples[SAMPLES_PER_FRAME - 1] = 300;
        let mut source = ReplaySource::from_bytes(frame_bytes(&samples), FRAME_LENGTH_BYTES);

        let reference = pipeline.tick(&mut source, &visual);
        assert!(pipeline.has_thermal_layer());
        assert_eq!(pipeline.stats().0, 1);

        // Five NoFrame ticks reuse the held thermal layer byte-for-byte
        for _ in 0..5 {
            let stale = pipeline.tick(&mut source, &visual);
            assert_eq!(stale.as_raw(), reference.as_raw());
        }
        assert_eq!(pipeline.stats().0, 1);
    }

    #[test]
    fn test_corrupt_candidate_keeps_prior_composite() {
        let mut pipeline = test_pipeline();
        let visual = RgbImage::from_pixel(32, 32, Rgb([10, 10, 10]));

        let mut samples = vec![0i16; SAMPLES_PER_FRAME];
        samples[5] = 450;
        let mut stream = frame_bytes(&samples);
        let mut bad = frame_bytes(&samples);
        bad[1] = 0x00; // corrupt the signature of the second frame
        stream.extend(bad);

        let mut source = ReplaySource::from_bytes(stream, FRAME_LENGTH_BYTES);

        let reference = pipeline.tick(&mut source, &visual);
        let after_corrupt = pipeline.tick(&mut source, &visual);

        assert_eq!(after_corrupt.as_raw(), reference.as_raw());
        let (frames, _, signature_errors) = pipeline.stats();
        assert_eq!(frames, 1);
        assert_eq!(signature_errors, 1);
    }

    #[test]
    fn test_fresh_frame_updates_composite() {
        let mut pipeline = test_pipeline();
        let visual = RgbImage::from_pixel(64, 48, Rgb([0, 0, 0]));

        // A cold-to-hot frame followed by a uniform frame; the uniform frame
        // normalizes to all index 0 (coolest), so the composite must change
        let mut gradient = vec![0i16; SAMPLES_PER_FRAME];
        for (i, s) in gradient.iter_mut().enumerate() {
            *s = i as i16;
        }
        let mut stream = frame_bytes(&gradient);
        stream.extend(frame_bytes(&vec![220i16; SAMPLES_PER_FRAME]));

        let mut source = ReplaySource::from_bytes(stream, FRAME_LENGTH_BYTES);

        let first = pipeline.tick(&mut source, &visual);
        let second = pipeline.tick(&mut source, &visual);

        assert_ne!(first.as_raw(), second.as_raw());
        assert_eq!(pipeline.stats().0, 2);
    }
}
