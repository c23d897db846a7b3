use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub overlay_text_color: String,
    pub overlay_fill_color: String,
    pub overlay_rect_color: String,
    pub overlay_font_family: String,
    pub overlay_font_path: Option<String>,
    pub detection_languages: String,
    pub detection_psm: u32,
    pub translate_endpoint: Option<String>,
    pub transcript_delimiter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            overlay_text_color: "#000000".to_string(),
            overlay_fill_color: "#ffffff".to_string(),
            overlay_rect_color: "#ff0000".to_string(),
            overlay_font_family: "Arial".to_string(),
            overlay_font_path: None,
            detection_languages: "tha+eng".to_string(),
            detection_psm: 6,
            translate_endpoint: None,
            transcript_delimiter: String::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    overlay: Option<OverlaySettings>,
    detection: Option<DetectionSettings>,
    translate: Option<TranslateSettings>,
    transcript: Option<TranscriptSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    text_color: Option<String>,
    fill_color: Option<String>,
    rect_color: Option<String>,
    font_family: Option<String>,
    font_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DetectionSettings {
    languages: Option<String>,
    psm: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslateSettings {
    endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TranscriptSettings {
    delimiter: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(overlay) = incoming.overlay {
            if let Some(color) = overlay.text_color {
                if !color.trim().is_empty() {
                    self.overlay_text_color = color;
                }
            }
            if let Some(color) = overlay.fill_color {
                if !color.trim().is_empty() {
                    self.overlay_fill_color = color;
                }
            }
            if let Some(color) = overlay.rect_color {
                if !color.trim().is_empty() {
                    self.overlay_rect_color = color;
                }
            }
            if let Some(family) = overlay.font_family {
                if !family.trim().is_empty() {
                    self.overlay_font_family = family;
                }
            }
            if let Some(path) = overlay.font_path {
                if !path.trim().is_empty() {
                    self.overlay_font_path = Some(path);
                }
            }
        }
        if let Some(detection) = incoming.detection {
            if let Some(languages) = detection.languages {
                if !languages.trim().is_empty() {
                    self.detection_languages = languages;
                }
            }
            if let Some(psm) = detection.psm {
                self.detection_psm = psm;
            }
        }
        if let Some(translate) = incoming.translate {
            if let Some(endpoint) = translate.endpoint {
                if !endpoint.trim().is_empty() {
                    self.translate_endpoint = Some(endpoint);
                }
            }
        }
        if let Some(transcript) = incoming.transcript {
            if let Some(delimiter) = transcript.delimiter {
                self.transcript_delimiter = delimiter;
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".image-translator-rust"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn defaults_replicate_the_hard_coded_surface() {
        let settings = Settings::default();
        assert_eq!(settings.overlay_fill_color, "#ffffff");
        assert_eq!(settings.overlay_text_color, "#000000");
        assert_eq!(settings.transcript_delimiter, "");
        assert_eq!(settings.detection_psm, 6);
    }

    #[test]
    fn extra_file_overrides_defaults() {
        with_temp_home(|home| {
            let path = home.join("extra.toml");
            fs::write(
                &path,
                "[overlay]\nfill_color = \"#222222\"\n[transcript]\ndelimiter = \"\\n\"\n",
            )
            .expect("write extra settings");

            let settings = load_settings(Some(&path)).expect("load settings");
            assert_eq!(settings.overlay_fill_color, "#222222");
            assert_eq!(settings.transcript_delimiter, "\n");
            // untouched keys keep their defaults
            assert_eq!(settings.overlay_text_color, "#000000");
        });
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        with_temp_home(|home| {
            let missing = home.join("nope.toml");
            assert!(load_settings(Some(&missing)).is_err());
        });
    }

    #[test]
    fn first_run_copies_the_default_settings_home() {
        with_temp_home(|home| {
            load_settings(None).expect("load settings");
            assert!(home.join(".image-translator-rust/settings.toml").exists());
        });
    }
}
