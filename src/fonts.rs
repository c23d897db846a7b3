use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;
use ttf_parser::{Face, name_id};
use usvg::fontdb;

/// A renderable font resource: the resolved family name plus the database
/// the rasterizer draws glyphs from.
#[derive(Clone)]
pub struct ResolvedFont {
    pub family: String,
    pub database: Arc<fontdb::Database>,
}

pub trait FontProvider {
    /// Resolve the requested family, substituting a default when it is
    /// unavailable. Substitution is non-fatal and logged.
    fn load(&self, family: &str) -> ResolvedFont;
}

pub struct SystemFonts {
    database: Arc<fontdb::Database>,
}

impl SystemFonts {
    pub fn new(font_path: Option<&Path>) -> Result<Self> {
        let mut database = fontdb::Database::new();
        database.load_system_fonts();
        if let Some(path) = font_path {
            let data = std::fs::read(path)
                .with_context(|| format!("failed to read font: {}", path.display()))?;
            database.load_font_data(data);
        }
        Ok(Self {
            database: Arc::new(database),
        })
    }

    pub fn with_database(database: fontdb::Database) -> Self {
        Self {
            database: Arc::new(database),
        }
    }

    fn family_available(&self, family: &str) -> bool {
        let families = [fontdb::Family::Name(family)];
        let query = fontdb::Query {
            families: &families,
            ..Default::default()
        };
        self.database.query(&query).is_some()
    }
}

#[cfg(target_os = "macos")]
fn fallback_families() -> &'static [&'static str] {
    &["NotoSans", "Hiragino Sans"]
}

#[cfg(target_os = "windows")]
fn fallback_families() -> &'static [&'static str] {
    &["NotoSans", "Arial Unicode"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn fallback_families() -> &'static [&'static str] {
    &["NotoSans", "DejaVu Sans"]
}

impl FontProvider for SystemFonts {
    fn load(&self, family: &str) -> ResolvedFont {
        if self.family_available(family) {
            return ResolvedFont {
                family: family.to_string(),
                database: self.database.clone(),
            };
        }
        for candidate in fallback_families() {
            if self.family_available(candidate) {
                warn!("font family '{}' not found; substituting '{}'", family, candidate);
                return ResolvedFont {
                    family: candidate.to_string(),
                    database: self.database.clone(),
                };
            }
        }
        warn!("font family '{}' not found; substituting generic sans-serif", family);
        ResolvedFont {
            family: "sans-serif".to_string(),
            database: self.database.clone(),
        }
    }
}

/// Family name of a font file, preferring the typographic family entry.
pub fn font_file_family(path: &Path) -> Result<String> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    let face = Face::parse(&data, 0)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))?;
    extract_family_name(&face)
        .ok_or_else(|| anyhow!("font has no readable family name: {}", path.display()))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_family_substitutes_a_default() {
        let fonts = SystemFonts::with_database(fontdb::Database::new());
        let resolved = fonts.load("Definitely Not Installed");
        assert_eq!(resolved.family, "sans-serif");
    }

    #[test]
    fn font_file_family_reports_the_failing_path() {
        let err = font_file_family(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/font.ttf"));
    }
}
