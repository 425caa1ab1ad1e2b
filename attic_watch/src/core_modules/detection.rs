// THEORY:
// A `Detection` is one bounding box reported by the external inference service
// for one frame. The engine never interprets its class or confidence; it only
// reduces the box to a single anchor point and asks which zones contain it.
//
// The anchor rule is explicit configuration. Centroid is the default; the
// bottom-centre rule approximates where an animal's feet touch the surface,
// and the top-left rule reproduces corner-based membership.

/// An axis-aligned box in pixel coordinates (top-left / bottom-right corners).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn from_xyxy(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Builds a box from a centre point and extent, the layout the hosted
    /// inference service reports predictions in.
    pub fn from_center(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x1: x - width / 2.0,
            y1: y - height / 2.0,
            x2: x + width / 2.0,
            y2: y + height / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }
}

/// Which point of a bounding box is tested for zone membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AnchorRule {
    #[default]
    Centroid,
    TopLeft,
    BottomCenter,
}

impl AnchorRule {
    pub fn anchor(&self, bbox: &BoundingBox) -> (f32, f32) {
        match self {
            AnchorRule::Centroid => ((bbox.x1 + bbox.x2) / 2.0, (bbox.y1 + bbox.y2) / 2.0),
            AnchorRule::TopLeft => (bbox.x1, bbox.y1),
            AnchorRule::BottomCenter => ((bbox.x1 + bbox.x2) / 2.0, bbox.y2),
        }
    }
}

/// A single observed object in a single frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Carried through from the model; not interpreted here.
    pub class_name: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, class_name: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            class_name: class_name.into(),
            confidence,
        }
    }

    /// Convenience for a detection centred on a point, mostly useful in tests
    /// and replay tooling.
    pub fn centered_at(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(BoundingBox::from_center(x, y, width, height), "animal", 1.0)
    }

    pub fn anchor(&self, rule: AnchorRule) -> (f32, f32) {
        rule.anchor(&self.bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_layout_converts_to_corners() {
        let bbox = BoundingBox::from_center(150.0, 150.0, 40.0, 20.0);
        assert_eq!(bbox, BoundingBox::from_xyxy(130.0, 140.0, 170.0, 160.0));
        assert_eq!(bbox.area(), 800.0);
    }

    #[test]
    fn anchor_rules() {
        let bbox = BoundingBox::from_xyxy(10.0, 20.0, 30.0, 60.0);
        assert_eq!(AnchorRule::Centroid.anchor(&bbox), (20.0, 40.0));
        assert_eq!(AnchorRule::TopLeft.anchor(&bbox), (10.0, 20.0));
        assert_eq!(AnchorRule::BottomCenter.anchor(&bbox), (20.0, 60.0));
    }

    #[test]
    fn inverted_box_has_zero_area() {
        let bbox = BoundingBox::from_xyxy(30.0, 30.0, 10.0, 10.0);
        assert_eq!(bbox.area(), 0.0);
    }

    #[test]
    fn default_anchor_is_centroid() {
        assert_eq!(AnchorRule::default(), AnchorRule::Centroid);
    }
}
