use anyhow::{Context, Result};
use tracing::warn;

use crate::compose::{Canvas, OutputComposer};
use crate::detection::{Detection, DetectionSource};
use crate::fonts::FontProvider;
use crate::overlay::{OverlayInstruction, OverlayPlanner, OverlayStyle};
use crate::report::ResultReporter;
use crate::translate::{TranslationMemo, TranslationResult, Translator};

/// The orchestration core. Capability handles are injected at construction
/// so the batch logic stays independent of any concrete backend.
pub struct Pipeline<D, T, F> {
    detector: D,
    translator: T,
    fonts: F,
}

pub struct PipelineRequest<'a> {
    pub image: &'a image::DynamicImage,
    pub target_lang: &'a str,
    pub font_family: &'a str,
    pub style: OverlayStyle,
    pub transcript_delimiter: &'a str,
}

pub struct PipelineOutput {
    pub canvas: Canvas,
    pub transcript: String,
    pub detections: Vec<Detection>,
    pub translations: Vec<TranslationResult>,
    pub instructions: Vec<OverlayInstruction>,
}

impl<D, T, F> Pipeline<D, T, F>
where
    D: DetectionSource,
    T: Translator,
    F: FontProvider,
{
    pub fn new(detector: D, translator: T, fonts: F) -> Self {
        Self {
            detector,
            translator,
            fonts,
        }
    }

    /// One linear batch: detect, then per detection translate, plan, and
    /// compose, in detection order. A failed translation keeps the original
    /// text for that region; everything else is fatal.
    pub async fn exec(
        &self,
        request: PipelineRequest<'_>,
        reporter: &mut ResultReporter,
    ) -> Result<PipelineOutput> {
        let detections = self
            .detector
            .detect(request.image)
            .with_context(|| "text detection failed")?;

        let font = self.fonts.load(request.font_family);
        let planner = OverlayPlanner::new(request.style);
        let canvas = Canvas::from_image(request.image)?;
        let mut composer = OutputComposer::new(canvas, font, request.transcript_delimiter);

        let mut memo = TranslationMemo::default();
        let mut translations = Vec::with_capacity(detections.len());
        let mut instructions = Vec::with_capacity(detections.len());

        for detection in &detections {
            let translated = match memo
                .translate(&self.translator, &detection.text, request.target_lang)
                .await
            {
                Ok(text) => text,
                Err(err) => {
                    warn!(
                        "translation failed for '{}': {}; keeping original text",
                        detection.text, err
                    );
                    detection.text.clone()
                }
            };

            let instruction = planner.plan(detection, &translated);
            composer.apply(&instruction)?;
            reporter.record(&detection.text, &translated, detection.confidence);
            translations.push(TranslationResult {
                source: detection.text.clone(),
                translated,
                target_lang: request.target_lang.to_string(),
            });
            instructions.push(instruction);
        }

        let transcript = composer.transcript();
        Ok(PipelineOutput {
            canvas: composer.finish(),
            transcript,
            detections,
            translations,
            instructions,
        })
    }
}
