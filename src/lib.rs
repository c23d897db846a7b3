use anyhow::{Context, Result, anyhow};
use image::GenericImageView;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod compare;
pub mod compose;
pub mod detection;
pub mod fonts;
pub mod logging;
pub mod overlay;
pub mod pipeline;
pub mod report;
pub mod settings;
pub mod translate;

#[cfg(test)]
mod test_util;

pub use compose::{Canvas, OutputComposer};
pub use detection::{Detection, DetectionDump, DetectionSource, Point, TesseractSource};
pub use fonts::{FontProvider, ResolvedFont, SystemFonts};
pub use overlay::{EraseRect, OverlayInstruction, OverlayPlanner, OverlayStyle};
pub use pipeline::{Pipeline, PipelineOutput, PipelineRequest};
pub use report::ResultReporter;
pub use translate::{GoogleTranslate, TranslateFuture, TranslationResult, Translator};

#[derive(Debug, Clone)]
pub struct Config {
    pub image_path: String,
    pub lang: String,
    pub source_lang: String,
    pub output_path: Option<String>,
    pub transcript_path: Option<String>,
    pub compare_path: Option<String>,
    pub no_compare: bool,
    pub detect_languages: Option<String>,
    pub settings_path: Option<String>,
    pub debug_detections: bool,
    pub verbose: bool,
}

#[derive(Debug)]
pub struct RunSummary {
    pub detections: usize,
    pub output_path: PathBuf,
    pub transcript_path: PathBuf,
    pub compare_path: Option<PathBuf>,
    pub duration: Duration,
}

pub async fn run(config: Config) -> Result<RunSummary> {
    let settings = settings::load_settings(config.settings_path.as_deref().map(Path::new))?;

    let image_path = Path::new(&config.image_path);
    let image_bytes = fs::read(image_path)
        .with_context(|| format!("could not open image: {}", image_path.display()))?;
    let image = image::load_from_memory(&image_bytes)
        .with_context(|| format!("could not decode image: {}", image_path.display()))?;

    let output_path = resolve_path(config.output_path.as_deref(), image_path, "_translated.png");
    let transcript_path = resolve_path(
        config.transcript_path.as_deref(),
        image_path,
        "_translated.txt",
    );
    let compare_path = if config.no_compare {
        None
    } else {
        Some(resolve_path(
            config.compare_path.as_deref(),
            image_path,
            "_compare.html",
        ))
    };

    let languages = config
        .detect_languages
        .as_deref()
        .unwrap_or(&settings.detection_languages);
    let detector = TesseractSource::new(languages, settings.detection_psm);
    let translator = GoogleTranslate::new(settings.translate_endpoint.as_deref())
        .with_source_lang(config.source_lang.clone());

    let font_path = settings.overlay_font_path.as_deref().map(Path::new);
    let font_provider = SystemFonts::new(font_path)?;
    let font_family = match font_path {
        Some(path) => match fonts::font_file_family(path) {
            Ok(family) => family,
            Err(err) => {
                tracing::warn!("{}; using configured family", err);
                settings.overlay_font_family.clone()
            }
        },
        None => settings.overlay_font_family.clone(),
    };

    let mut reporter = ResultReporter::new();
    let pipeline = Pipeline::new(detector, translator, font_provider);
    let output = pipeline
        .exec(
            PipelineRequest {
                image: &image,
                target_lang: &config.lang,
                font_family: &font_family,
                style: OverlayStyle {
                    text_color: settings.overlay_text_color.clone(),
                    fill_color: settings.overlay_fill_color.clone(),
                },
                transcript_delimiter: &settings.transcript_delimiter,
            },
            &mut reporter,
        )
        .await?;

    if config.debug_detections {
        write_detection_dump(
            image_path,
            &image_bytes,
            &image,
            &output.detections,
            &settings.overlay_rect_color,
            &reporter,
        )?;
    }

    fs::write(&transcript_path, output.transcript.as_bytes())
        .with_context(|| format!("failed to write transcript: {}", transcript_path.display()))?;
    reporter.artifact("Transcript", &transcript_path);

    let format = output_format(&output_path)?;
    let encoded = output.canvas.encode(format)?;
    fs::write(&output_path, &encoded).with_context(|| {
        format!(
            "failed to write translated image: {}",
            output_path.display()
        )
    })?;
    reporter.artifact("Translated image", &output_path);

    if let Some(path) = compare_path.as_deref() {
        let annotated = annotate_original(
            &image_bytes,
            &image,
            &output.detections,
            &settings.overlay_rect_color,
        )?;
        let translated_png = if format == image::ImageFormat::Png {
            encoded
        } else {
            output.canvas.encode(image::ImageFormat::Png)?
        };
        let html = compare::render_page(&annotated, &translated_png)?;
        fs::write(path, html)
            .with_context(|| format!("failed to write comparison page: {}", path.display()))?;
        reporter.artifact("Comparison page", path);
    }

    let duration = reporter.finish();
    Ok(RunSummary {
        detections: output.detections.len(),
        output_path,
        transcript_path,
        compare_path,
        duration,
    })
}

/// Original bytes when the container is one the rasterizer can embed,
/// otherwise a PNG re-encode of the decoded image.
fn annotate_original(
    image_bytes: &[u8],
    image: &image::DynamicImage,
    detections: &[Detection],
    rect_color: &str,
) -> Result<Vec<u8>> {
    let reencoded;
    let (embed_bytes, embed_mime): (&[u8], &str) = match infer::get(image_bytes) {
        Some(kind)
            if matches!(
                kind.mime_type(),
                "image/png" | "image/jpeg" | "image/gif" | "image/webp"
            ) =>
        {
            (image_bytes, kind.mime_type())
        }
        _ => {
            reencoded = compare::encode_png(image)?;
            (&reencoded, "image/png")
        }
    };
    compare::render_detection_boxes(
        embed_bytes,
        embed_mime,
        image.width(),
        image.height(),
        detections,
        rect_color,
    )
}

fn write_detection_dump(
    image_path: &Path,
    image_bytes: &[u8],
    image: &image::DynamicImage,
    detections: &[Detection],
    rect_color: &str,
    reporter: &ResultReporter,
) -> Result<()> {
    let dump = DetectionDump::for_input(image_path);
    dump.write_json(detections)?;
    reporter.artifact("Detection json", dump.json_path());

    let annotated = annotate_original(image_bytes, image, detections, rect_color)?;
    fs::write(dump.image_path(), annotated).with_context(|| {
        format!(
            "failed to write detection image: {}",
            dump.image_path().display()
        )
    })?;
    reporter.artifact("Detection image", dump.image_path());
    Ok(())
}

fn resolve_path(requested: Option<&str>, image_path: &Path, suffix: &str) -> PathBuf {
    if let Some(path) = requested {
        return PathBuf::from(path);
    }
    let stem = image_path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("output");
    image_path.with_file_name(format!("{stem}{suffix}"))
}

fn output_format(path: &Path) -> Result<image::ImageFormat> {
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => Ok(image::ImageFormat::Png),
        "jpg" | "jpeg" => Ok(image::ImageFormat::Jpeg),
        "gif" => Ok(image::ImageFormat::Gif),
        "webp" => Ok(image::ImageFormat::WebP),
        "bmp" => Ok(image::ImageFormat::Bmp),
        "tif" | "tiff" => Ok(image::ImageFormat::Tiff),
        _ => Err(anyhow!(
            "unsupported output image extension: {}",
            path.display()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_sit_next_to_the_input() {
        let image_path = Path::new("/data/thai_text.gif");
        assert_eq!(
            resolve_path(None, image_path, "_translated.png"),
            PathBuf::from("/data/thai_text_translated.png")
        );
        assert_eq!(
            resolve_path(Some("/tmp/out.png"), image_path, "_translated.png"),
            PathBuf::from("/tmp/out.png")
        );
    }

    #[test]
    fn output_format_follows_the_extension() {
        assert_eq!(
            output_format(Path::new("a.PNG")).unwrap(),
            image::ImageFormat::Png
        );
        assert_eq!(
            output_format(Path::new("a.jpeg")).unwrap(),
            image::ImageFormat::Jpeg
        );
        assert!(output_format(Path::new("a.xyz")).is_err());
        assert!(output_format(Path::new("a")).is_err());
    }
}
