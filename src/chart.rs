//! Chart URL assembly.
//!
//! A chart URL is `irealbook://` followed by six `=`-separated fields:
//! title, composer, style, key, the literal `n`, and the progression.

use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::analysis::{KeyEstimate, Mode};
use crate::error::ChartError;
use crate::model::{Part, Score};
use crate::progression::build_progression;

pub const SCHEME: &str = "irealbook://";

/// Everything outside the RFC 3986 unreserved set gets encoded.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Caller-supplied chart settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartOptions {
    /// Style field, e.g. "Medium Swing"; `Unknown` when unset
    pub style: Option<String>,
}

impl ChartOptions {
    pub fn with_style(style: impl Into<String>) -> Self {
        ChartOptions { style: Some(style.into()) }
    }
}

/// A fully assembled chart URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartUrl {
    pub title: String,
    pub composer: String,
    pub style: String,
    pub key: String,
    pub progression: String,
}

impl ChartUrl {
    pub fn from_score(score: &Score, options: &ChartOptions) -> Result<Self, ChartError> {
        let part = select_chord_part(score)?;
        let progression = build_progression(part);
        if progression.is_empty() && !part.measures.is_empty() {
            return Err(ChartError::NoChords);
        }

        let chart = ChartUrl {
            title: format_title(score.title.as_deref()),
            composer: format_composer(score.composer.as_deref()),
            style: format_style(options.style.as_deref()),
            key: format_key(score.estimate_key().as_ref()),
            progression,
        };
        debug!(
            "chart for part '{}': title={:?} key={} ({} measures)",
            part.id,
            chart.title,
            chart.key,
            part.measures.len()
        );
        Ok(chart)
    }

    /// The unencoded URL.
    pub fn raw(&self) -> String {
        format!(
            "{SCHEME}{}={}={}={}=n={}",
            self.title, self.composer, self.style, self.key, self.progression
        )
    }

    /// The URL with every reserved character percent-encoded.
    pub fn encoded(&self) -> String {
        utf8_percent_encode(&self.raw(), COMPONENT).to_string()
    }

    /// `<a href="...">title</a>` pointing at the encoded URL.
    pub fn html_anchor(&self) -> String {
        format!(r#"<a href="{}">{}</a>"#, self.encoded(), escape_html(&self.title))
    }
}

/// First part carrying a chord, voiced or as a chord symbol.
pub fn select_chord_part(score: &Score) -> Result<&Part, ChartError> {
    score
        .parts
        .iter()
        .find(|p| p.has_chords())
        .ok_or(ChartError::NoChords)
}

/// Trimmed title, `Untitled` when empty, with a leading article moved to
/// the end: "The Nearness of You" becomes "Nearness of You, The".
pub fn format_title(title: Option<&str>) -> String {
    let title = title.map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return "Untitled".to_string();
    }
    match title.get(..4) {
        Some(article) if article.eq_ignore_ascii_case("the ") => {
            format!("{}, The", title[4..].trim_start())
        }
        _ => title.to_string(),
    }
}

/// Composer as "Last First...", `Unknown` when empty.
pub fn format_composer(composer: Option<&str>) -> String {
    let words: Vec<&str> = composer.unwrap_or_default().split_whitespace().collect();
    match words.split_last() {
        None => "Unknown".to_string(),
        Some((last, [])) => last.to_string(),
        Some((last, rest)) => format!("{last} {}", rest.join(" ")),
    }
}

pub fn format_style(style: Option<&str>) -> String {
    match style.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "Unknown".to_string(),
    }
}

/// Key field: tonic with `b` flats, `-` suffix for minor, `C` by default.
pub fn format_key(estimate: Option<&KeyEstimate>) -> String {
    let Some(estimate) = estimate else {
        return "C".to_string();
    };
    let tonic = estimate.tonic.trim().replace('-', "b");
    if tonic.is_empty() {
        return "C".to_string();
    }
    match estimate.mode {
        Mode::Major => tonic,
        Mode::Minor => format!("{tonic}-"),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
