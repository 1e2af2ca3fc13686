//! scorechart: turns MusicXML lead sheets into chord-chart protocol URLs.
//!
//! Supports both uncompressed MusicXML (.musicxml) and compressed MXL (.mxl) files.
//!
//! # Example
//! ```no_run
//! use scorechart::{parse_file, score_to_irealpro_url};
//!
//! let score = parse_file("path/to/score.musicxml").unwrap();
//! let url = score_to_irealpro_url(&score, Some("Medium Swing")).unwrap();
//! println!("{url}");
//! ```

pub mod analysis;
pub mod chart;
pub mod chords;
pub mod detect;
pub mod error;
pub mod model;
pub mod mxl;
pub mod parser;
pub mod progression;
pub mod token;

use std::path::Path;

pub use chart::{ChartOptions, ChartUrl};
pub use error::ChartError;
pub use model::*;
pub use mxl::parse_mxl;
pub use parser::parse_musicxml;
pub use progression::build_progression;

/// Parse a MusicXML file from a file path.
/// Automatically detects format based on file extension:
/// - `.musicxml` or `.xml` → uncompressed MusicXML
/// - `.mxl` → compressed MXL (ZIP archive)
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Score, String> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .map_err(|e| format!("Failed to read file '{}': {e}", path.display()))?;

    parse_bytes(&data, path.extension().and_then(|e| e.to_str()))
}

/// Parse MusicXML from raw bytes with an optional format hint.
/// If `extension` is None, tries to auto-detect the format.
pub fn parse_bytes(data: &[u8], extension: Option<&str>) -> Result<Score, String> {
    match extension {
        Some("mxl") => parse_mxl(data),
        Some("musicxml") | Some("xml") => {
            let xml = std::str::from_utf8(data)
                .map_err(|e| format!("Invalid UTF-8 in MusicXML file: {e}"))?;
            parse_musicxml(xml)
        }
        _ => {
            if let Ok(xml) = std::str::from_utf8(data) {
                if xml.trim_start().starts_with('<') {
                    return parse_musicxml(xml);
                }
            }
            parse_mxl(data)
        }
    }
}

/// Convert a parsed score to a JSON string.
pub fn score_to_json(score: &Score) -> Result<String, String> {
    serde_json::to_string_pretty(score).map_err(|e| format!("JSON serialization error: {e}"))
}

/// Percent-encoded chart URL for a score.
pub fn score_to_irealpro_url(score: &Score, style: Option<&str>) -> Result<String, ChartError> {
    Ok(ChartUrl::from_score(score, &options_for(style))?.encoded())
}

/// Unencoded chart URL for a score.
pub fn score_to_irealpro_raw_url(score: &Score, style: Option<&str>) -> Result<String, ChartError> {
    Ok(ChartUrl::from_score(score, &options_for(style))?.raw())
}

/// HTML anchor linking to the chart URL, labelled with the chart title.
pub fn score_to_irealpro_html(score: &Score, style: Option<&str>) -> Result<String, ChartError> {
    Ok(ChartUrl::from_score(score, &options_for(style))?.html_anchor())
}

/// Read, parse and encode a score file in one go.
pub fn chart_for_file<P: AsRef<Path>>(
    path: P,
    options: &ChartOptions,
) -> Result<ChartUrl, ChartError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| ChartError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let score = parse_bytes(&data, path.extension().and_then(|e| e.to_str()))?;
    ChartUrl::from_score(&score, options)
}

fn options_for(style: Option<&str>) -> ChartOptions {
    ChartOptions { style: style.map(str::to_string) }
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI for iOS (static library) and other native hosts
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Parse a score file and return its percent-encoded chart URL as a C string.
/// The caller must free the returned string with `scorechart_free_string`.
///
/// `style` may be null, in which case the style field reads `Unknown`.
///
/// # Safety
/// `path` must be a valid null-terminated UTF-8 C string; `style` must be
/// null or a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn scorechart_url_for_file(
    path: *const c_char,
    style: *const c_char,
) -> *mut c_char {
    if path.is_null() {
        return std::ptr::null_mut();
    }
    let c_str = unsafe { CStr::from_ptr(path) };
    let path_str = match c_str.to_str() {
        Ok(s) => s,
        Err(_) => return std::ptr::null_mut(),
    };
    let style = if style.is_null() {
        None
    } else {
        unsafe { CStr::from_ptr(style) }.to_str().ok()
    };

    match chart_for_file(path_str, &options_for(style)) {
        Ok(chart) => CString::new(chart.encoded()).unwrap_or_default().into_raw(),
        Err(e) => {
            log::warn!("scorechart_url_for_file: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Free a string previously returned by scorechart functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a scorechart function, or null.
#[no_mangle]
pub unsafe extern "C" fn scorechart_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
