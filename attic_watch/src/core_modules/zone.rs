// THEORY:
// The `zone` module owns the fixed spatial tessellation of the frame. A `Zone` is
// a square window slid across the frame at a constant stride, and the full set of
// windows is the vocabulary every higher layer speaks: the scorer counts into
// zones, trap placements are ranked zones, accessways are remembered zones.
//
// Key architectural principles:
// 1.  **Built Once**: The grid is a pure function of frame size, stride and zone
//     size. It is built at startup and never changes for the life of the process.
// 2.  **Deliberate Overlap**: With a stride smaller than the zone size, windows
//     overlap. A single point is covered by several zones, which gives the ranking
//     a finer spatial resolution than a disjoint grid of the same zone size.
// 3.  **Pure Data**: A `Zone` is only coordinates plus a stable `ZoneId`. It holds
//     no activity counts and knows nothing about how it is drawn; counts come
//     fresh from the scorer and drawing lives in the presentation layer.
// 4.  **Total**: A configuration that cannot fit a single zone produces an empty
//     grid rather than an error. Every consumer treats "no zones" as "no activity".

/// Stable identity of a zone: its index in grid build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneId(pub u32);

/// An axis-aligned rectangle of the frame, in pixel coordinates.
/// Membership is a closed interval on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Zone {
    pub id: ZoneId,
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Zone {
    pub fn new(id: ZoneId, x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { id, x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Returns true if the point lies inside the zone, boundary included.
    pub fn contains(&self, point: (f32, f32)) -> bool {
        let (x, y) = point;
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        x >= self.x1 as f32 && x <= self.x2 as f32 && y >= self.y1 as f32 && y <= self.y2 as f32
    }
}

/// Upper bound on the number of zones in one grid.
pub const MAX_ZONES: usize = 1 << 20;

/// Slides a `zone_size` square across the frame with step `stride` and returns
/// every window that fits.
///
/// The number of windows per axis is `(frame_dim - zone_size) / stride`. Windows
/// are emitted column-major: all rows of the first column, then the next column.
/// A zero stride or zero zone size, or a zone at least as large as the frame on
/// either axis, yields an empty grid. So does a grid of more than [`MAX_ZONES`]
/// windows.
pub fn build_zones(frame_width: u32, frame_height: u32, stride: u32, zone_size: u32) -> Vec<Zone> {
    if stride == 0 || zone_size == 0 || zone_size >= frame_width || zone_size >= frame_height {
        return Vec::new();
    }

    let n_x_shifts = (frame_width - zone_size) / stride;
    let n_y_shifts = (frame_height - zone_size) / stride;
    let count = match (n_x_shifts as usize).checked_mul(n_y_shifts as usize) {
        Some(count) if count <= MAX_ZONES => count,
        _ => {
            tracing::warn!(
                n_x_shifts,
                n_y_shifts,
                max = MAX_ZONES,
                "zone grid too large; using an empty grid"
            );
            return Vec::new();
        }
    };
    let mut zones = Vec::with_capacity(count);

    for x in 0..n_x_shifts {
        for y in 0..n_y_shifts {
            let x1 = x * stride;
            let y1 = y * stride;
            // Bounded by MAX_ZONES, so the index fits in a u32.
            let id = ZoneId(zones.len() as u32);
            zones.push(Zone::new(id, x1, y1, x1 + zone_size, y1 + zone_size));
        }
    }

    zones
}

/// The built tessellation together with the parameters that produced it.
#[derive(Debug, Clone)]
pub struct ZoneGrid {
    pub frame_width: u32,
    pub frame_height: u32,
    pub stride: u32,
    pub zone_size: u32,
    zones: Vec<Zone>,
}

impl ZoneGrid {
    pub fn new(frame_width: u32, frame_height: u32, stride: u32, zone_size: u32) -> Self {
        let zones = build_zones(frame_width, frame_height, stride, zone_size);
        if zones.is_empty() {
            tracing::warn!(
                frame_width,
                frame_height,
                stride,
                zone_size,
                "zone grid is empty; no activity will be scored"
            );
        }
        Self {
            frame_width,
            frame_height,
            stride,
            zone_size,
            zones,
        }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn get(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(id.0 as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_grid_counts() {
        assert_eq!(build_zones(1280, 720, 100, 200).len(), 10 * 5);
        assert_eq!(build_zones(1280, 720, 40, 50).len(), 30 * 16);
    }

    #[test]
    fn first_zone_starts_at_origin() {
        let zones = build_zones(1280, 720, 100, 200);
        assert_eq!(zones[0], Zone::new(ZoneId(0), 0, 0, 200, 200));
        // Column-major: the second zone is one stride down, not across.
        assert_eq!(zones[1], Zone::new(ZoneId(1), 0, 100, 200, 300));
    }

    #[test]
    fn ids_follow_build_order() {
        let zones = build_zones(640, 480, 50, 100);
        for (i, zone) in zones.iter().enumerate() {
            assert_eq!(zone.id, ZoneId(i as u32));
        }
    }

    #[test]
    fn zones_stay_inside_frame() {
        let (w, h) = (1280, 720);
        for zone in build_zones(w, h, 40, 50) {
            assert!(zone.x2 <= w && zone.y2 <= h, "{zone:?} leaves the frame");
            assert_eq!(zone.width(), 50);
            assert_eq!(zone.height(), 50);
        }
    }

    #[test]
    fn oversized_zone_gives_empty_grid() {
        assert!(build_zones(200, 720, 100, 200).is_empty());
        assert!(build_zones(1280, 150, 100, 200).is_empty());
        assert!(build_zones(1280, 720, 0, 200).is_empty());
        assert!(build_zones(1280, 720, 100, 0).is_empty());
    }

    #[test]
    fn huge_grid_degrades_to_empty() {
        assert!(build_zones(200_000, 200_000, 2, 100).is_empty());
        assert!(build_zones(u32::MAX, u32::MAX, 1, 1).is_empty());
        // Exactly at the cap still builds.
        assert_eq!(build_zones(1024 + 1, 1024 + 1, 1, 1).len(), MAX_ZONES);
    }

    #[test]
    fn boundary_is_inclusive() {
        let zone = Zone::new(ZoneId(0), 0, 0, 200, 200);
        assert!(zone.contains((0.0, 0.0)));
        assert!(zone.contains((200.0, 200.0)));
        assert!(!zone.contains((200.1, 100.0)));
        assert!(!zone.contains((f32::NAN, 10.0)));
    }

    #[test]
    fn grid_lookup_by_id() {
        let grid = ZoneGrid::new(1280, 720, 100, 200);
        assert_eq!(grid.len(), 50);
        let zone = grid.get(ZoneId(7)).copied();
        assert_eq!(zone.map(|z| z.id), Some(ZoneId(7)));
        assert!(grid.get(ZoneId(50)).is_none());
    }
}
