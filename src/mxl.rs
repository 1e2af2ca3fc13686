//! Compressed MusicXML (.mxl) reader.
//!
//! An .mxl file is a ZIP archive whose `META-INF/container.xml` names the
//! root score document. Archives without a container fall back to the
//! first `.xml`/`.musicxml` entry outside `META-INF/`.

use std::io::{Cursor, Read};

use log::debug;
use zip::ZipArchive;

use crate::model::Score;
use crate::parser;

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Read and parse a .mxl file from raw bytes.
pub fn parse_mxl(data: &[u8]) -> Result<Score, String> {
    let xml = extract_musicxml_from_mxl(data)?;
    parser::parse_musicxml(&xml)
}

/// Extract the root MusicXML document from .mxl bytes.
pub fn extract_musicxml_from_mxl(data: &[u8]) -> Result<String, String> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| format!("Failed to open MXL archive: {e}"))?;

    let root_path = match read_entry(&mut archive, CONTAINER_PATH)? {
        Some(container) => rootfile_from_container(&container)?,
        None => guess_rootfile(&archive)?,
    };
    debug!("mxl root document: {root_path}");

    read_entry(&mut archive, &root_path)?
        .ok_or_else(|| format!("Root file '{root_path}' not found in archive"))
}

/// Read one archive entry as UTF-8; `Ok(None)` when the entry is missing.
fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, String> {
    let mut file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(format!("Failed to open '{name}': {e}")),
    };
    let mut text = String::new();
    file.read_to_string(&mut text)
        .map_err(|e| format!("Failed to read '{name}': {e}"))?;
    Ok(Some(text))
}

fn rootfile_from_container(xml: &str) -> Result<String, String> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| format!("Failed to parse container.xml: {e}"))?;
    doc.descendants()
        .filter(|n| n.tag_name().name() == "rootfile")
        .find_map(|n| n.attribute("full-path"))
        .map(String::from)
        .ok_or_else(|| "No rootfile found in container.xml".to_string())
}

/// Without a container, take the first score-looking file outside META-INF.
fn guess_rootfile(archive: &ZipArchive<Cursor<&[u8]>>) -> Result<String, String> {
    let names: Vec<String> = archive.file_names().map(String::from).collect();
    names
        .iter()
        .find(|name| {
            !name.starts_with("META-INF/")
                && (name.ends_with(".xml") || name.ends_with(".musicxml"))
        })
        .cloned()
        .ok_or_else(|| format!("No MusicXML file found in archive. Files: {names:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const SCORE: &str = r#"<score-partwise version="4.0">
  <work><work-title>Zipped</work-title></work>
  <part-list><score-part id="P1"><part-name>Guitar</part-name></score-part></part-list>
  <part id="P1"><measure number="1"/></part>
</score-partwise>"#;

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, body) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn follows_container_rootfile() {
        let container = r#"<container><rootfiles><rootfile full-path="scores/tune.xml"/></rootfiles></container>"#;
        let data = archive(&[(CONTAINER_PATH, container), ("scores/tune.xml", SCORE)]);
        let score = parse_mxl(&data).unwrap();
        assert_eq!(score.title.as_deref(), Some("Zipped"));
        assert_eq!(score.parts[0].name, "Guitar");
    }

    #[test]
    fn guesses_rootfile_without_container() {
        let data = archive(&[("readme.txt", "hi"), ("tune.musicxml", SCORE)]);
        let score = parse_mxl(&data).unwrap();
        assert_eq!(score.measure_count(), 1);
    }

    #[test]
    fn missing_rootfile_is_an_error() {
        let container = r#"<container><rootfiles><rootfile full-path="gone.xml"/></rootfiles></container>"#;
        let data = archive(&[(CONTAINER_PATH, container)]);
        let err = parse_mxl(&data).unwrap_err();
        assert!(err.contains("gone.xml"));
    }

    #[test]
    fn rejects_non_zip_bytes() {
        assert!(parse_mxl(b"definitely not a zip").is_err());
    }
}
