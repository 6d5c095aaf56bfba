//! Runtime configuration
//!
//! Paths and locale come from environment variables, falling back to the
//! platform directories. Everything is resolved once at startup and passed
//! down explicitly.

use anyhow::Result;
use chrono::{Local, TimeZone};
use std::env;
use std::path::PathBuf;

use crate::db::Database;

// Environment variable names
const ENV_DB: &str = "NOTECMD_DB";
const ENV_EXPORT_DIR: &str = "NOTECMD_EXPORT_DIR";
const ENV_LEGACY_DIR: &str = "NOTECMD_LEGACY_DIR";
const ENV_LOCALE: &str = "NOTECMD_LOCALE";
const ENV_PDF_RENDERER: &str = "NOTECMD_PDF_RENDERER";

const DEFAULT_LOCALE: &str = "en_US";
const DEFAULT_PDF_RENDERER: &str = "wkhtmltopdf";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    /// Scratch directory for single-note exports; emptied before every export.
    pub export_dir: PathBuf,
    /// Directory holding the pre-database `notes/`, `deleted/`, `archived/` folders.
    pub legacy_dir: PathBuf,
    pub locale: String,
    pub pdf_renderer: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_path = match env::var_os(ENV_DB) {
            Some(path) => PathBuf::from(path),
            None => Database::default_path()?,
        };

        let export_dir = match env::var_os(ENV_EXPORT_DIR) {
            Some(path) => PathBuf::from(path),
            None => dirs::cache_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?
                .join("notecmd")
                .join("exported"),
        };

        let legacy_dir = match env::var_os(ENV_LEGACY_DIR) {
            Some(path) => PathBuf::from(path),
            None => dirs::data_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?
                .join("notecmd"),
        };

        let locale = [ENV_LOCALE, "LC_ALL", "LANG"]
            .iter()
            .filter_map(|key| env::var(key).ok())
            .find(|value| !value.is_empty() && value != "C" && value != "POSIX")
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());

        let pdf_renderer =
            env::var(ENV_PDF_RENDERER).unwrap_or_else(|_| DEFAULT_PDF_RENDERER.to_string());

        Ok(Self {
            db_path,
            export_dir,
            legacy_dir,
            locale,
            pdf_renderer,
        })
    }

    pub fn date_formatter(&self) -> DateFormatter {
        DateFormatter::for_locale(&self.locale)
    }
}

/// Chinese and Japanese put the year first; every other language uses day-month-year.
const CJK_PATTERN: &str = "%Y年 %b %-d日 (%a)";
const DEFAULT_PATTERN: &str = "%a %-d %b %Y";

/// Formats creation dates for exports.
#[derive(Debug, Clone, Copy)]
pub struct DateFormatter {
    locale: chrono::Locale,
    pattern: &'static str,
}

impl DateFormatter {
    /// Accepts `ja_JP`, `zh-CN`, `de_DE.UTF-8` and plain language codes.
    pub fn for_locale(tag: &str) -> Self {
        let normalized = tag
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .replace('-', "_");
        let language = normalized.split('_').next().unwrap_or_default().to_lowercase();

        let pattern = match language.as_str() {
            "zh" | "ja" => CJK_PATTERN,
            _ => DEFAULT_PATTERN,
        };
        let locale = chrono::Locale::try_from(normalized.as_str()).unwrap_or(chrono::Locale::POSIX);

        Self { locale, pattern }
    }

    pub fn pattern(&self) -> &'static str {
        self.pattern
    }

    /// Format an epoch-millisecond timestamp in local time.
    pub fn format(&self, timestamp_ms: i64) -> String {
        match Local.timestamp_millis_opt(timestamp_ms).single() {
            Some(date) => date.format_localized(self.pattern, self.locale).to_string(),
            None => String::new(),
        }
    }
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self::for_locale(DEFAULT_LOCALE)
    }
}
