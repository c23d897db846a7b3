use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::io::Write;
use std::process::Command;

use super::{Detection, DetectionSource};

/// Text detection backed by the `tesseract` binary. Each call writes the
/// image to a temporary PNG and parses the TSV output into line-level
/// detections.
#[derive(Debug, Clone)]
pub struct TesseractSource {
    languages: String,
    psm: u32,
}

impl TesseractSource {
    pub fn new(languages: impl Into<String>, psm: u32) -> Self {
        Self {
            languages: languages.into(),
            psm,
        }
    }
}

impl DetectionSource for TesseractSource {
    fn detect(&self, image: &image::DynamicImage) -> Result<Vec<Detection>> {
        let mut tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for detection")?;
        image
            .write_to(&mut tmp, image::ImageFormat::Png)
            .with_context(|| "failed to write temp image for detection")?;
        tmp.flush().ok();

        let tsv = run_tesseract_tsv(tmp.path(), &self.languages, self.psm)?;
        Ok(parse_tsv(&tsv))
    }
}

fn run_tesseract_tsv(path: &std::path::Path, languages: &str, psm: u32) -> Result<String> {
    let output = Command::new("tesseract")
        .arg(path)
        .arg("stdout")
        .arg("-l")
        .arg(languages)
        .arg("--oem")
        .arg("1")
        .arg("--psm")
        .arg(psm.to_string())
        .arg("tsv")
        .output()
        .with_context(|| "failed to run tesseract (is it installed?)")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract failed: {}", stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

struct WordToken {
    text: String,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    conf: f32,
}

/// Level-5 TSV rows are words; rows sharing (page, block, paragraph, line)
/// form one detection.
fn parse_tsv(tsv: &str) -> Vec<Detection> {
    let mut word_map: HashMap<(i32, i32, i32, i32), Vec<WordToken>> = HashMap::new();

    for (idx, row) in tsv.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < 12 {
            continue;
        }
        let level: i32 = cols[0].parse().unwrap_or(0);
        if level != 5 {
            continue;
        }
        let page: i32 = cols[1].parse().unwrap_or(0);
        let block: i32 = cols[2].parse().unwrap_or(0);
        let par: i32 = cols[3].parse().unwrap_or(0);
        let line: i32 = cols[4].parse().unwrap_or(0);
        let left: u32 = cols[6].parse().unwrap_or(0);
        let top: u32 = cols[7].parse().unwrap_or(0);
        let width: u32 = cols[8].parse().unwrap_or(0);
        let height: u32 = cols[9].parse().unwrap_or(0);
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        word_map
            .entry((page, block, par, line))
            .or_default()
            .push(WordToken {
                text: text.to_string(),
                x: left,
                y: top,
                w: width,
                h: height,
                conf,
            });
    }

    let mut rects: Vec<(u32, u32, u32, u32, String, f32)> = Vec::new();
    for (_, mut words) in word_map {
        words.sort_by_key(|word| word.x);
        if let Some(line) = build_line(&words) {
            rects.push(line);
        }
    }
    rects.sort_by_key(|&(x, y, ..)| (y, x));

    rects
        .into_iter()
        .map(|(x, y, w, h, text, conf)| {
            Detection::from_rect(x as i32, y as i32, w as i32, h as i32, text, conf)
        })
        .collect()
}

fn build_line(words: &[WordToken]) -> Option<(u32, u32, u32, u32, String, f32)> {
    let first = words.first()?;

    let mut text = String::new();
    let mut last_token = "";
    for word in words {
        if !text.is_empty() && needs_space(last_token, &word.text) {
            text.push(' ');
        }
        text.push_str(&word.text);
        last_token = &word.text;
    }

    let mut x1 = first.x;
    let mut y1 = first.y;
    let mut x2 = first.x + first.w;
    let mut y2 = first.y + first.h;
    let mut conf_sum = 0.0;
    let mut len_sum = 0.0;
    for word in words {
        x1 = x1.min(word.x);
        y1 = y1.min(word.y);
        x2 = x2.max(word.x + word.w);
        y2 = y2.max(word.y + word.h);
        let weight = word.text.chars().count().max(1) as f32;
        conf_sum += word.conf * weight;
        len_sum += weight;
    }

    // tesseract reports confidence as 0..100
    let confidence = (conf_sum / len_sum / 100.0).clamp(0.0, 1.0);
    Some((x1, y1, x2 - x1, y2 - y1, text, confidence))
}

fn needs_space(left: &str, right: &str) -> bool {
    let last = left.chars().next_back();
    let first = right.chars().next();
    match (last, first) {
        (Some(a), Some(b)) => a.is_alphanumeric() && b.is_alphanumeric() && (a.is_ascii() || b.is_ascii()),
        _ => false,
    }
}
