// THEORY:
// The render module is the presentation adapter for the engine's output. Zones
// are plain coordinates in the engine; here they are paired with a `ZoneStyle`
// and turned into pixels. Trap placements are drawn as thick green outlines,
// accessways as blue outlines, and each detection's anchor as a small red dot,
// all on top of a still of the space (or a dark canvas when none is given).

use attic_watch::{AnchorRule, CycleReport, Detection, Zone};
use image::{Rgba, RgbaImage};

pub const TRAP_COLOR: Rgba<u8> = Rgba([0, 200, 0, 255]);
pub const ACCESSWAY_COLOR: Rgba<u8> = Rgba([30, 110, 255, 255]);
pub const ANCHOR_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const CANVAS_COLOR: Rgba<u8> = Rgba([24, 24, 24, 255]);
const ANCHOR_RADIUS: i64 = 2;

/// How a zone is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneStyle {
    pub color: Rgba<u8>,
    /// Outline width in pixels, drawn inward from the zone's edge.
    pub thickness: u32,
}

impl ZoneStyle {
    pub fn trap() -> Self {
        Self {
            color: TRAP_COLOR,
            thickness: 4,
        }
    }

    pub fn accessway() -> Self {
        Self {
            color: ACCESSWAY_COLOR,
            thickness: 2,
        }
    }
}

/// Draws the outline of `zone`, clipped to the image.
pub fn draw_zone(image: &mut RgbaImage, zone: &Zone, style: ZoneStyle) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let x_max = zone.x2.min(width - 1);
    let y_max = zone.y2.min(height - 1);
    if zone.x1 > x_max || zone.y1 > y_max {
        return;
    }

    for inset in 0..style.thickness {
        let (left, top) = (zone.x1 + inset, zone.y1 + inset);
        let (Some(right), Some(bottom)) = (x_max.checked_sub(inset), y_max.checked_sub(inset)) else {
            break;
        };
        if left > right || top > bottom {
            break;
        }
        for x in left..=right {
            image.put_pixel(x, top, style.color);
            image.put_pixel(x, bottom, style.color);
        }
        for y in top..=bottom {
            image.put_pixel(left, y, style.color);
            image.put_pixel(right, y, style.color);
        }
    }
}

/// Draws a small filled dot at `point`, clipped to the image.
pub fn draw_anchor(image: &mut RgbaImage, point: (f32, f32), color: Rgba<u8>) {
    if !point.0.is_finite() || !point.1.is_finite() {
        return;
    }
    let (width, height) = image.dimensions();
    let (cx, cy) = (point.0.round() as i64, point.1.round() as i64);
    for dy in -ANCHOR_RADIUS..=ANCHOR_RADIUS {
        for dx in -ANCHOR_RADIUS..=ANCHOR_RADIUS {
            if dx * dx + dy * dy > ANCHOR_RADIUS * ANCHOR_RADIUS {
                continue;
            }
            let (x, y) = (cx + dx, cy + dy);
            if x >= 0 && y >= 0 && (x as u64) < width as u64 && (y as u64) < height as u64 {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// A blank canvas matching the frame size.
pub fn blank_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, CANVAS_COLOR)
}

/// Draws the current engine output over a copy of `background`.
pub fn render_overlay(
    background: &RgbaImage,
    report: &CycleReport,
    detections: &[Detection],
    anchor: AnchorRule,
    max_trap_placements: usize,
) -> RgbaImage {
    let mut frame = background.clone();

    for zone in &report.accessways {
        draw_zone(&mut frame, zone, ZoneStyle::accessway());
    }
    for ranked in report.top_placements(max_trap_placements) {
        draw_zone(&mut frame, &ranked.zone, ZoneStyle::trap());
    }
    for detection in detections {
        draw_anchor(&mut frame, detection.anchor(anchor), ANCHOR_COLOR);
    }

    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use attic_watch::{RankedZone, ZoneId};

    fn zone(x1: u32, y1: u32, x2: u32, y2: u32) -> Zone {
        Zone::new(ZoneId(0), x1, y1, x2, y2)
    }

    #[test]
    fn outline_has_requested_thickness() {
        let mut image = blank_canvas(100, 100);
        draw_zone(&mut image, &zone(10, 10, 50, 50), ZoneStyle::trap());
        for x in 10..14 {
            assert_eq!(*image.get_pixel(x, 30), TRAP_COLOR);
        }
        assert_eq!(*image.get_pixel(14, 30), CANVAS_COLOR);
        assert_eq!(*image.get_pixel(30, 30), CANVAS_COLOR);
        assert_eq!(*image.get_pixel(50, 50), TRAP_COLOR);
    }

    #[test]
    fn zone_past_the_edge_is_clipped() {
        let mut image = blank_canvas(60, 60);
        draw_zone(&mut image, &zone(40, 40, 240, 240), ZoneStyle::accessway());
        assert_eq!(*image.get_pixel(59, 59), ACCESSWAY_COLOR);
        assert_eq!(*image.get_pixel(40, 50), ACCESSWAY_COLOR);

        // Entirely outside: nothing drawn, nothing panics.
        draw_zone(&mut image, &zone(100, 100, 300, 300), ZoneStyle::trap());
    }

    #[test]
    fn anchor_near_corner_is_clipped() {
        let mut image = blank_canvas(10, 10);
        draw_anchor(&mut image, (0.0, 0.0), ANCHOR_COLOR);
        draw_anchor(&mut image, (-50.0, 5.0), ANCHOR_COLOR);
        draw_anchor(&mut image, (f32::NAN, 5.0), ANCHOR_COLOR);
        assert_eq!(*image.get_pixel(0, 0), ANCHOR_COLOR);
        assert_eq!(*image.get_pixel(5, 5), CANVAS_COLOR);
    }

    #[test]
    fn overlay_highlights_only_top_placements() {
        let background = blank_canvas(400, 400);
        let placements: Vec<RankedZone> = [(0, 0), (200, 0), (0, 200)]
            .into_iter()
            .enumerate()
            .map(|(i, (x, y))| RankedZone {
                zone: Zone::new(ZoneId(i as u32), x, y, x + 100, y + 100),
                trigger_count: 3 - i as u32,
            })
            .collect();
        let report = CycleReport {
            trap_placements: placements,
            ..CycleReport::default()
        };
        let detections = [Detection::centered_at(300.0, 300.0, 10.0, 10.0)];

        let frame = render_overlay(&background, &report, &detections, AnchorRule::Centroid, 2);
        assert_eq!(*frame.get_pixel(0, 50), TRAP_COLOR);
        assert_eq!(*frame.get_pixel(200, 50), TRAP_COLOR);
        assert_eq!(*frame.get_pixel(0, 250), CANVAS_COLOR);
        assert_eq!(*frame.get_pixel(300, 300), ANCHOR_COLOR);
        // The background is untouched.
        assert_eq!(*background.get_pixel(0, 50), CANVAS_COLOR);
    }
}
