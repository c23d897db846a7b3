use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use image_translator_rust::{
    Detection, DetectionSource, FontProvider, OverlayStyle, Pipeline, PipelineRequest,
    ResolvedFont, ResultReporter, TranslateFuture, Translator,
};
use usvg::fontdb;

struct StaticDetections(Vec<Detection>);

impl DetectionSource for StaticDetections {
    fn detect(&self, _image: &image::DynamicImage) -> Result<Vec<Detection>> {
        Ok(self.0.clone())
    }
}

struct FixedTranslations(HashMap<String, String>);

impl FixedTranslations {
    fn of(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        )
    }
}

impl Translator for FixedTranslations {
    fn translate(&self, text: &str, _target_lang: &str) -> TranslateFuture {
        let hit = self.0.get(text).cloned();
        Box::pin(async move { hit.ok_or_else(|| anyhow!("no translation on file")) })
    }
}

struct FailingTranslator;

impl Translator for FailingTranslator {
    fn translate(&self, _text: &str, _target_lang: &str) -> TranslateFuture {
        Box::pin(async { Err(anyhow!("backend unavailable")) })
    }
}

struct NoFonts;

impl FontProvider for NoFonts {
    fn load(&self, _family: &str) -> ResolvedFont {
        ResolvedFont {
            family: "sans-serif".to_string(),
            database: Arc::new(fontdb::Database::new()),
        }
    }
}

fn solid_image(width: u32, height: u32, color: [u8; 4]) -> image::DynamicImage {
    image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        width,
        height,
        image::Rgba(color),
    ))
}

fn request(image: &image::DynamicImage) -> PipelineRequest<'_> {
    PipelineRequest {
        image,
        target_lang: "en",
        font_family: "Arial",
        style: OverlayStyle {
            text_color: "#000000".to_string(),
            fill_color: "#ffffff".to_string(),
        },
        transcript_delimiter: "",
    }
}

#[tokio::test]
async fn transcript_matches_detection_order_without_separator() {
    let image = solid_image(200, 120, [0, 0, 0, 255]);
    let pipeline = Pipeline::new(
        StaticDetections(vec![
            Detection::from_rect(10, 10, 100, 30, "สวัสดี", 0.93),
            Detection::from_rect(10, 60, 100, 30, "ครับ", 0.88),
        ]),
        FixedTranslations::of(&[("สวัสดี", "hello"), ("ครับ", "sir")]),
        NoFonts,
    );
    let mut reporter = ResultReporter::new();
    let output = pipeline.exec(request(&image), &mut reporter).await.unwrap();

    assert_eq!(output.transcript, "hellosir");
    assert_eq!(output.translations.len(), 2);
    assert_eq!(output.translations[0].translated, "hello");
    assert_eq!(output.translations[1].translated, "sir");
    assert_eq!(reporter.records().len(), 2);
}

#[tokio::test]
async fn canvas_keeps_source_dimensions() {
    let image = solid_image(123, 45, [10, 20, 30, 255]);
    let pipeline = Pipeline::new(
        StaticDetections(vec![Detection::from_rect(5, 5, 50, 20, "x", 0.5)]),
        FixedTranslations::of(&[("x", "y")]),
        NoFonts,
    );
    let mut reporter = ResultReporter::new();
    let output = pipeline.exec(request(&image), &mut reporter).await.unwrap();
    assert_eq!(output.canvas.width(), 123);
    assert_eq!(output.canvas.height(), 45);
}

#[tokio::test]
async fn empty_detection_list_leaves_pixels_untouched() {
    let source = image::RgbaImage::from_fn(6, 5, |x, y| {
        image::Rgba([(x * 40) as u8, (y * 50) as u8, 100, 255])
    });
    let image = image::DynamicImage::ImageRgba8(source.clone());
    let pipeline = Pipeline::new(StaticDetections(Vec::new()), FailingTranslator, NoFonts);
    let mut reporter = ResultReporter::new();
    let output = pipeline.exec(request(&image), &mut reporter).await.unwrap();

    assert_eq!(output.transcript, "");
    assert!(output.detections.is_empty());
    for y in 0..5 {
        for x in 0..6 {
            assert_eq!(
                output.canvas.pixel(x, y),
                Some(source.get_pixel(x, y).0),
                "pixel ({x},{y}) changed"
            );
        }
    }
}

#[tokio::test]
async fn failed_translations_fall_back_to_the_original_text() {
    let image = solid_image(200, 120, [0, 0, 0, 255]);
    let pipeline = Pipeline::new(
        StaticDetections(vec![
            Detection::from_rect(10, 10, 100, 30, "สวัสดี", 0.93),
            Detection::from_rect(10, 60, 100, 30, "ครับ", 0.88),
        ]),
        FailingTranslator,
        NoFonts,
    );
    let mut reporter = ResultReporter::new();
    let output = pipeline.exec(request(&image), &mut reporter).await.unwrap();
    assert_eq!(output.transcript, "สวัสดีครับ");
    assert_eq!(output.translations[0].translated, "สวัสดี");
}

#[tokio::test]
async fn erase_rectangle_is_filled_with_the_background() {
    let image = solid_image(200, 100, [0, 0, 0, 255]);
    let pipeline = Pipeline::new(
        StaticDetections(vec![Detection::from_rect(10, 10, 100, 30, "ทดสอบ", 0.9)]),
        FixedTranslations::of(&[("ทดสอบ", "test")]),
        NoFonts,
    );
    let mut reporter = ResultReporter::new();
    let output = pipeline.exec(request(&image), &mut reporter).await.unwrap();

    assert_eq!(output.instructions.len(), 1);
    assert_eq!(output.instructions[0].font_size, 16);
    assert_eq!(output.instructions[0].origin, (10, 10));

    // inside the erase rectangle
    assert_eq!(output.canvas.pixel(60, 35), Some([255, 255, 255, 255]));
    // outside it, the source shows through
    assert_eq!(output.canvas.pixel(5, 5), Some([0, 0, 0, 255]));
    assert_eq!(output.canvas.pixel(150, 80), Some([0, 0, 0, 255]));
}
