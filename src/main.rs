use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "image-translator-rust",
    version,
    about = "Detect, translate, and overlay text in images"
)]
struct Cli {
    /// Source image to translate
    image: String,

    /// Target language (default: en)
    #[arg(short = 'l', long = "lang", default_value = "en")]
    lang: String,

    /// Source language hint for the translator. Use "auto" to detect.
    #[arg(long = "source-lang", default_value = "auto")]
    source_lang: String,

    /// Translated image output path (default: <image>_translated.png)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Transcript output path (default: <image>_translated.txt)
    #[arg(short = 't', long = "transcript")]
    transcript: Option<String>,

    /// Comparison page output path (default: <image>_compare.html)
    #[arg(short = 'c', long = "compare")]
    compare: Option<String>,

    /// Skip the comparison page
    #[arg(long = "no-compare")]
    no_compare: bool,

    /// Detection languages passed to the OCR backend (e.g. tha+eng)
    #[arg(short = 'L', long = "detect-langs")]
    detect_langs: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Write the detection list and bbox overlay next to the input
    #[arg(long = "debug-detections")]
    debug_detections: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    image_translator_rust::logging::init(cli.verbose)?;

    let summary = image_translator_rust::run(image_translator_rust::Config {
        image_path: cli.image,
        lang: cli.lang,
        source_lang: cli.source_lang,
        output_path: cli.output,
        transcript_path: cli.transcript,
        compare_path: cli.compare,
        no_compare: cli.no_compare,
        detect_languages: cli.detect_langs,
        settings_path: cli.read_settings,
        debug_detections: cli.debug_detections,
        verbose: cli.verbose,
    })
    .await?;

    println!(
        "Translated image saved to: {}",
        summary.output_path.display()
    );
    println!("Transcript saved to: {}", summary.transcript_path.display());
    if let Some(path) = summary.compare_path {
        println!("Comparison page saved to: {}", path.display());
    }
    Ok(())
}
