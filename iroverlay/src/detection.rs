/*!
Detection-collaborator boundary.

The detection service is external; this module only defines the record
shape it returns and renders the records as box outlines, producing the
annotated visual layer the compositor blends against. Each box carries a
confidence marker: a filled bar above the outline whose length is
proportional to the record's confidence. Label text is not rasterized
(that would pull in font rendering for a caption the blend halves anyway).
*/

use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Box outline color
const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Outline thickness in pixels
const BOX_THICKNESS: u32 = 2;

/// Confidence marker height in pixels
const MARKER_HEIGHT: u32 = 3;

/// One detection record in visual-frame pixel coordinates.
///
/// `x`/`y` anchor the top-left corner of the box; order and cardinality per
/// frame are unspecified by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(rename = "class")]
    pub label: String,
    pub confidence: f32,
}

/// Load detection records from a JSON file
pub fn load_detections<P: AsRef<Path>>(path: P) -> Result<Vec<Detection>> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read detections file: {}", path.as_ref().display()))?;

    let detections: Vec<Detection> =
        serde_json::from_str(&content).with_context(|| "failed to parse detections as JSON")?;

    Ok(detections)
}

/// Draw a box outline and confidence marker for every detection
pub fn draw_detections(frame: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
        debug!(
            "annotating {} ({:.2}) at ({}, {})",
            detection.label, detection.confidence, detection.x, detection.y
        );
        draw_box(frame, detection);
        draw_confidence_marker(frame, detection);
    }
}

/// Draw one clipped rectangle outline
fn draw_box(frame: &mut RgbImage, detection: &Detection) {
    let (frame_width, frame_height) = frame.dimensions();
    if frame_width == 0 || frame_height == 0 {
        return;
    }

    let x0 = detection.x.clamp(0.0, (frame_width - 1) as f32) as u32;
    let y0 = detection.y.clamp(0.0, (frame_height - 1) as f32) as u32;
    let x1 = (detection.x + detection.width).clamp(0.0, (frame_width - 1) as f32) as u32;
    let y1 = (detection.y + detection.height).clamp(0.0, (frame_height - 1) as f32) as u32;
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    for x in x0..=x1 {
        for t in 0..BOX_THICKNESS {
            let top = y0 + t;
            if top <= y1 {
                frame.put_pixel(x, top, BOX_COLOR);
            }
            let bottom = y1.saturating_sub(t);
            if bottom >= y0 {
                frame.put_pixel(x, bottom, BOX_COLOR);
            }
        }
    }

    for y in y0..=y1 {
        for t in 0..BOX_THICKNESS {
            let left = x0 + t;
            if left <= x1 {
                frame.put_pixel(left, y, BOX_COLOR);
            }
            let right = x1.saturating_sub(t);
            if right >= x0 {
                frame.put_pixel(right, y, BOX_COLOR);
            }
        }
    }
}

/// Draw a filled bar above the box, length proportional to confidence.
///
/// Skipped when the box touches the top edge or the bar would be empty.
fn draw_confidence_marker(frame: &mut RgbImage, detection: &Detection) {
    let (frame_width, frame_height) = frame.dimensions();
    if frame_width == 0 || frame_height == 0 {
        return;
    }

    let x0 = detection.x.clamp(0.0, (frame_width - 1) as f32) as u32;
    let y0 = detection.y.clamp(0.0, (frame_height - 1) as f32) as u32;
    let x1 = (detection.x + detection.width).clamp(0.0, (frame_width - 1) as f32) as u32;
    if x1 <= x0 {
        return;
    }

    let length = ((x1 - x0) as f32 * detection.confidence.clamp(0.0, 1.0)).round() as u32;
    let bottom = match y0.checked_sub(2) {
        Some(bottom) => bottom,
        None => return, // no room above the outline
    };
    if length == 0 {
        return;
    }

    let top = y0.saturating_sub(MARKER_HEIGHT + 1);
    for y in top..=bottom {
        for x in x0..x0 + length {
            frame.put_pixel(x, y, BOX_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_record_parses_service_fields() {
        let json = r#"[
            {"x": 120.0, "y": 40.5, "width": 64.0, "height": 32.0,
             "class": "insulator", "confidence": 0.87}
        ]"#;

        let detections: Vec<Detection> = serde_json::from_str(json).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "insulator");
        assert_eq!(detections[0].y, 40.5);
    }

    #[test]
    fn test_draw_box_marks_outline() {
        let mut frame = RgbImage::new(100, 100);
        let detection = Detection {
            x: 10.0,
            y: 10.0,
            width: 20.0,
            height: 20.0,
            label: "transformer".to_string(),
            confidence: 0.5,
        };

        draw_detections(&mut frame, &[detection]);

        assert_eq!(*frame.get_pixel(10, 10), BOX_COLOR); // corner
        assert_eq!(*frame.get_pixel(20, 10), BOX_COLOR); // top edge
        assert_eq!(*frame.get_pixel(10, 20), BOX_COLOR); // left edge
        assert_eq!(*frame.get_pixel(30, 30), BOX_COLOR); // opposite corner
        assert_eq!(*frame.get_pixel(20, 20), Rgb([0, 0, 0])); // interior untouched
    }

    #[test]
    fn test_confidence_marker_scales_with_confidence() {
        let mut frame = RgbImage::new(100, 100);
        let detection = Detection {
            x: 10.0,
            y: 10.0,
            width: 20.0,
            height: 20.0,
            label: "breaker".to_string(),
            confidence: 0.5,
        };

        draw_detections(&mut frame, &[detection]);

        // Bar sits above the outline and spans half the box width
        assert_eq!(*frame.get_pixel(10, 8), BOX_COLOR);
        assert_eq!(*frame.get_pixel(19, 8), BOX_COLOR);
        assert_eq!(*frame.get_pixel(20, 8), Rgb([0, 0, 0]));
        // Gap row between marker and outline stays clear
        assert_eq!(*frame.get_pixel(10, 9), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_confidence_marker_skipped_at_top_edge() {
        let mut frame = RgbImage::new(50, 50);
        let detection = Detection {
            x: 5.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            label: "pole".to_string(),
            confidence: 0.9,
        };

        // No room above the outline; must not panic or wrap
        draw_detections(&mut frame, &[detection]);
        assert_eq!(*frame.get_pixel(5, 0), BOX_COLOR);
    }

    #[test]
    fn test_draw_box_clips_to_frame() {
        let mut frame = RgbImage::new(50, 50);
        let detection = Detection {
            x: 40.0,
            y: -5.0,
            width: 100.0,
            height: 30.0,
            label: "pole".to_string(),
            confidence: 0.3,
        };

        // Must not panic; edges clamp to the frame
        draw_detections(&mut frame, &[detection]);
        assert_eq!(*frame.get_pixel(49, 0), BOX_COLOR);
    }
}
