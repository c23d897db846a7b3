use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::io::Cursor;
use time::{OffsetDateTime, format_description};
use tiny_skia::Pixmap;
use usvg::{Options, Tree};

use crate::compose::escape_xml;
use crate::detection::Detection;

const COMPARE_TEMPLATE: &str = include_str!("templates/compare.html.tera");
const DETECTION_STROKE_WIDTH: u32 = 2;

/// Burn detection rectangles into the original image and return it as PNG.
pub fn render_detection_boxes(
    image_bytes: &[u8],
    image_mime: &str,
    width: u32,
    height: u32,
    detections: &[Detection],
    stroke_color: &str,
) -> Result<Vec<u8>> {
    let encoded = BASE64.encode(image_bytes);
    let data_uri = format!("data:{};base64,{}", image_mime, encoded);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = data_uri,
        w = width,
        h = height
    ));

    for detection in detections {
        let x = detection.quad[0].x;
        let y = detection.quad[0].y;
        let w = detection.quad[2].x - x;
        let h = detection.quad[2].y - y;
        if w <= 0.0 || h <= 0.0 {
            continue;
        }
        svg.push_str(&format!(
            r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="none" stroke="{stroke}" stroke-width="{sw}"/>"#,
            x = x,
            y = y,
            w = w,
            h = h,
            stroke = escape_xml(stroke_color),
            sw = DETECTION_STROKE_WIDTH
        ));
    }

    svg.push_str("</svg>");
    rasterize_svg(&svg)
}

fn rasterize_svg(svg: &str) -> Result<Vec<u8>> {
    let options = Options::default();
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse comparison overlay")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty comparison size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    let image = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("failed to build comparison buffer"))?;
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .with_context(|| "failed to encode comparison image")?;
    Ok(bytes)
}

pub fn encode_png(image: &image::DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    image
        .write_to(&mut cursor, image::ImageFormat::Png)
        .with_context(|| "failed to encode image as PNG")?;
    Ok(bytes)
}

/// Two-panel page embedding both images as data URIs.
pub fn render_page(annotated_png: &[u8], translated_png: &[u8]) -> Result<String> {
    let generated_at = OffsetDateTime::now_utc()
        .format(&format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string());

    let mut context = tera::Context::new();
    context.insert("title", "Image Translation");
    context.insert("original_uri", &data_uri("image/png", annotated_png));
    context.insert("translated_uri", &data_uri("image/png", translated_png));
    context.insert("generated_at", &generated_at);
    tera::Tera::one_off(COMPARE_TEMPLATE, &context, true)
        .with_context(|| "failed to render comparison page")
}

fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn white_png(width: u32, height: u32) -> Vec<u8> {
        let buffer = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
        encode_png(&image::DynamicImage::ImageRgba8(buffer)).unwrap()
    }

    #[test]
    fn annotated_image_keeps_the_source_dimensions() {
        let png = white_png(10, 10);
        let detections = vec![Detection::from_rect(2, 2, 6, 6, "x", 0.8)];
        let bytes =
            render_detection_boxes(&png, "image/png", 10, 10, &detections, "#ff0000").unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 10);
        assert_eq!(decoded.height(), 10);
    }

    #[test]
    fn detection_rectangles_are_stroked_onto_the_image() {
        let png = white_png(12, 12);
        let detections = vec![Detection::from_rect(3, 3, 6, 6, "x", 0.8)];
        let bytes =
            render_detection_boxes(&png, "image/png", 12, 12, &detections, "#ff0000").unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        let stroked = decoded
            .pixels()
            .any(|pixel| pixel.0[0] > 200 && pixel.0[1] < 80 && pixel.0[2] < 80);
        assert!(stroked, "expected red stroke pixels in the overlay");
        // far corner stays untouched
        assert_eq!(decoded.get_pixel(11, 11).0, [255, 255, 255, 255]);
    }

    #[test]
    fn page_embeds_both_panels() {
        let html = render_page(b"left-bytes", b"right-bytes").unwrap();
        assert!(html.contains("Original Image"));
        assert!(html.contains("Translated Image"));
        assert!(html.contains(&data_uri("image/png", b"left-bytes")));
        assert!(html.contains(&data_uri("image/png", b"right-bytes")));
        assert!(html.contains("Generated at"));
    }
}
