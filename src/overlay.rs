use serde::Serialize;

use crate::detection::Detection;

/// Hard floor for the overlay font, applied no matter how small (or
/// inverted) the detected box is.
pub const MIN_FONT_SIZE: i32 = 16;

#[derive(Debug, Clone, Serialize)]
pub struct OverlayStyle {
    pub text_color: String,
    pub fill_color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EraseRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// One concrete overlay: erase the rectangle, then draw the text at the
/// origin with the resolved font size.
#[derive(Debug, Clone, Serialize)]
pub struct OverlayInstruction {
    pub erase: EraseRect,
    pub origin: (i32, i32),
    pub font_size: u32,
    pub text: String,
    pub text_color: String,
    pub fill_color: String,
}

pub struct OverlayPlanner {
    style: OverlayStyle,
}

impl OverlayPlanner {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    /// Corners are read positionally: point 0 is the erase origin, point 2
    /// the opposite corner, whatever the quad's actual orientation.
    pub fn plan(&self, detection: &Detection, translated: &str) -> OverlayInstruction {
        let x1 = detection.quad[0].x as i32;
        let y1 = detection.quad[0].y as i32;
        let x2 = detection.quad[2].x as i32;
        let y2 = detection.quad[2].y as i32;

        let box_height = y2 - y1;
        let font_size = (box_height / 2).max(MIN_FONT_SIZE);

        OverlayInstruction {
            erase: EraseRect { x1, y1, x2, y2 },
            origin: (x1, y1),
            font_size: font_size as u32,
            text: translated.to_string(),
            text_color: self.style.text_color.clone(),
            fill_color: self.style.fill_color.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Point;

    fn planner() -> OverlayPlanner {
        OverlayPlanner::new(OverlayStyle {
            text_color: "#000000".to_string(),
            fill_color: "#ffffff".to_string(),
        })
    }

    #[test]
    fn reads_corners_zero_and_two() {
        let detection = Detection {
            quad: [
                Point { x: 10.0, y: 10.0 },
                Point { x: 110.0, y: 10.0 },
                Point { x: 110.0, y: 40.0 },
                Point { x: 10.0, y: 40.0 },
            ],
            text: "ทดสอบ".to_string(),
            confidence: 0.9,
        };
        let instruction = planner().plan(&detection, "test");
        assert_eq!(
            instruction.erase,
            EraseRect {
                x1: 10,
                y1: 10,
                x2: 110,
                y2: 40
            }
        );
        assert_eq!(instruction.origin, (10, 10));
        assert_eq!(instruction.font_size, 16);
        assert_eq!(instruction.text, "test");
    }

    #[test]
    fn tall_boxes_scale_the_font_to_half_height() {
        let detection = Detection::from_rect(0, 0, 200, 90, "x", 1.0);
        let instruction = planner().plan(&detection, "x");
        assert_eq!(instruction.font_size, 45);
    }

    #[test]
    fn short_boxes_hit_the_floor() {
        let detection = Detection::from_rect(5, 5, 80, 10, "x", 1.0);
        let instruction = planner().plan(&detection, "x");
        assert_eq!(instruction.font_size, 16);
    }

    #[test]
    fn inverted_boxes_still_plan_at_the_floor() {
        let detection = Detection {
            quad: [
                Point { x: 10.0, y: 40.0 },
                Point { x: 110.0, y: 40.0 },
                Point { x: 110.0, y: 10.0 },
                Point { x: 10.0, y: 10.0 },
            ],
            text: "x".to_string(),
            confidence: 0.2,
        };
        let instruction = planner().plan(&detection, "x");
        assert_eq!(instruction.font_size, 16);
        assert_eq!(
            instruction.erase,
            EraseRect {
                x1: 10,
                y1: 40,
                x2: 110,
                y2: 10
            }
        );
    }

    #[test]
    fn colors_come_from_the_style() {
        let planner = OverlayPlanner::new(OverlayStyle {
            text_color: "#123456".to_string(),
            fill_color: "#abcdef".to_string(),
        });
        let detection = Detection::from_rect(0, 0, 10, 10, "x", 1.0);
        let instruction = planner.plan(&detection, "x");
        assert_eq!(instruction.text_color, "#123456");
        assert_eq!(instruction.fill_color, "#abcdef");
    }
}
