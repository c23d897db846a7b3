use anyhow::{Context, Result, anyhow};
use std::io::Cursor;
use tiny_skia::Pixmap;
use usvg::{Options, Tree};

use crate::fonts::ResolvedFont;
use crate::overlay::OverlayInstruction;

// Vertical gap between literal text lines, in pixels.
const LINE_GAP: u32 = 4;

/// Mutable pixel buffer the overlays accumulate on. Created once per run as
/// a copy of the source image.
pub struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    pub fn from_image(image: &image::DynamicImage) -> Result<Self> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut pixmap =
            Pixmap::new(width, height).ok_or_else(|| anyhow!("image has zero dimensions"))?;
        for (pixel, out) in rgba.pixels().zip(pixmap.pixels_mut()) {
            let [r, g, b, a] = pixel.0;
            *out = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Straight-alpha RGBA of one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.pixmap.width() || y >= self.pixmap.height() {
            return None;
        }
        let index = (y * self.pixmap.width() + x) as usize;
        let color = self.pixmap.pixels().get(index)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }

    pub fn encode(&self, format: image::ImageFormat) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.pixmap.data().len());
        for pixel in self.pixmap.pixels() {
            let color = pixel.demultiply();
            data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        let buffer = image::RgbaImage::from_raw(self.width(), self.height(), data)
            .ok_or_else(|| anyhow!("failed to build image buffer from canvas"))?;
        let dynamic = match format {
            // JPEG has no alpha channel
            image::ImageFormat::Jpeg => {
                image::DynamicImage::ImageRgb8(image::DynamicImage::ImageRgba8(buffer).to_rgb8())
            }
            _ => image::DynamicImage::ImageRgba8(buffer),
        };
        let mut bytes = Vec::new();
        let mut cursor = Cursor::new(&mut bytes);
        dynamic
            .write_to(&mut cursor, format)
            .with_context(|| "failed to encode output image")?;
        Ok(bytes)
    }
}

/// Applies overlay instructions in detection order (erase, then draw) and
/// collects the transcript. Owns the canvas for the whole composition.
pub struct OutputComposer {
    canvas: Canvas,
    font: ResolvedFont,
    transcript: Vec<String>,
    delimiter: String,
}

impl OutputComposer {
    pub fn new(canvas: Canvas, font: ResolvedFont, delimiter: impl Into<String>) -> Self {
        Self {
            canvas,
            font,
            transcript: Vec::new(),
            delimiter: delimiter.into(),
        }
    }

    pub fn apply(&mut self, instruction: &OverlayInstruction) -> Result<()> {
        let svg = overlay_svg(
            instruction,
            &self.font.family,
            self.canvas.width(),
            self.canvas.height(),
        );
        let options = Options {
            fontdb: self.font.database.clone(),
            ..Options::default()
        };
        let tree = Tree::from_str(&svg, &options).with_context(|| "failed to build overlay")?;
        resvg::render(
            &tree,
            tiny_skia::Transform::identity(),
            &mut self.canvas.pixmap.as_mut(),
        );
        self.transcript.push(instruction.text.clone());
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.transcript.len()
    }

    pub fn transcript(&self) -> String {
        self.transcript.join(&self.delimiter)
    }

    pub fn finish(self) -> Canvas {
        self.canvas
    }
}

/// One instruction as an SVG fragment sized to the canvas. Degenerate erase
/// rectangles get no rect element; the text is still placed.
fn overlay_svg(instruction: &OverlayInstruction, family: &str, width: u32, height: u32) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );

    let erase = instruction.erase;
    let (rect_w, rect_h) = (erase.x2 - erase.x1, erase.y2 - erase.y1);
    if rect_w > 0 && rect_h > 0 {
        svg.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="{fill}"/>"#,
            x = erase.x1,
            y = erase.y1,
            w = rect_w,
            h = rect_h,
            fill = escape_xml(&instruction.fill_color)
        ));
    }

    if !instruction.text.is_empty() {
        let (x, y) = instruction.origin;
        let size = instruction.font_size;
        let line_height = size + LINE_GAP;
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" font-family="{family}" fill="{color}">"#,
            x = x,
            y = y + size as i32,
            size = size,
            family = escape_xml(family),
            color = escape_xml(&instruction.text_color)
        ));
        for (idx, line) in instruction.text.split('\n').enumerate() {
            let line = if line.is_empty() { " " } else { line };
            if idx == 0 {
                svg.push_str(&format!(
                    r#"<tspan x="{x}" dy="0">{text}</tspan>"#,
                    x = x,
                    text = escape_xml(line)
                ));
            } else {
                svg.push_str(&format!(
                    r#"<tspan x="{x}" dy="{dy}">{text}</tspan>"#,
                    x = x,
                    dy = line_height,
                    text = escape_xml(line)
                ));
            }
        }
        svg.push_str("</text>");
    }

    svg.push_str("</svg>");
    svg
}

pub(crate) fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
