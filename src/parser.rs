//! MusicXML parser: converts MusicXML XML into the Score data model.

use log::warn;
use roxmltree::{Document, Node};

use crate::model::*;

/// Parse a MusicXML XML string into a Score.
pub fn parse_musicxml(xml: &str) -> Result<Score, String> {
    // MusicXML files include a DOCTYPE declaration, so we must allow DTDs
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = Document::parse_with_options(xml, options)
        .map_err(|e| format!("XML parse error: {e}"))?;
    let root = doc.root_element();

    // Verify this is a score-partwise document
    if root.tag_name().name() != "score-partwise" {
        return Err(format!(
            "Unsupported root element: '{}'. Only 'score-partwise' is supported.",
            root.tag_name().name()
        ));
    }

    let mut score = Score::new();
    score.version = root.attribute("version").map(String::from);

    for child in root.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "work" => parse_work(&child, &mut score),
            "movement-title" => {
                if score.title.is_none() {
                    score.title = non_empty_text(&child);
                }
            }
            "identification" => parse_identification(&child, &mut score),
            "credit" => parse_credit(&child, &mut score),
            "part-list" => parse_part_list(&child, &mut score),
            "part" => parse_part(&child, &mut score),
            _ => {}
        }
    }

    Ok(score)
}

// ─── Work ────────────────────────────────────────────────────────────

fn parse_work(node: &Node, score: &mut Score) {
    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "work-title" {
            // Only use work-title as a fallback; <credit type="title"> takes priority.
            if score.title.is_none() {
                score.title = non_empty_text(&child);
            }
        }
    }
}

// ─── Identification ──────────────────────────────────────────────────

fn parse_identification(node: &Node, score: &mut Score) {
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "creator" if child.attribute("type") == Some("composer") => {
                if score.composer.is_none() {
                    score.composer = non_empty_text(&child);
                }
            }
            _ => {}
        }
    }
}

// ─── Credits ─────────────────────────────────────────────────────────

fn parse_credit(node: &Node, score: &mut Score) {
    let mut credit_type = String::new();
    let mut credit_text = String::new();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "credit-type" => {
                credit_type = child.text().unwrap_or("").trim().to_string();
            }
            "credit-words" => {
                let text = child.text().unwrap_or("").trim();
                if !text.is_empty() {
                    if !credit_text.is_empty() {
                        credit_text.push(' ');
                    }
                    credit_text.push_str(text);
                }
            }
            _ => {}
        }
    }

    if credit_text.is_empty() {
        return;
    }
    // <credit> values are the primary source for title and composer;
    // <work-title> and <creator type="composer"> are fallbacks.
    match credit_type.as_str() {
        "title" => score.title = Some(credit_text),
        "composer" => score.composer = Some(credit_text),
        _ => {}
    }
}

// ─── Part List ───────────────────────────────────────────────────────

fn parse_part_list(node: &Node, score: &mut Score) {
    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "score-part" {
            let mut part = Part::new(child.attribute("id").unwrap_or(""), "");

            for sp_child in child.children().filter(|n| n.is_element()) {
                if sp_child.tag_name().name() == "part-name" {
                    part.name = sp_child.text().unwrap_or("").trim().to_string();
                }
            }

            score.parts.push(part);
        }
    }
}

// ─── Part (measures) ─────────────────────────────────────────────────

fn parse_part(node: &Node, score: &mut Score) {
    let part_id = node.attribute("id").unwrap_or("");

    let idx = match score.parts.iter().position(|p| p.id == part_id) {
        Some(i) => i,
        None => {
            warn!("part '{part_id}' has no <score-part> entry; keeping it unnamed");
            score.parts.push(Part::new(part_id, ""));
            score.parts.len() - 1
        }
    };
    let part = &mut score.parts[idx];

    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "measure" {
            part.measures.push(parse_measure(&child));
        }
    }
}

// ─── Measure ─────────────────────────────────────────────────────────

fn parse_measure(node: &Node) -> Measure {
    let number = node
        .attribute("number")
        .and_then(|n| n.parse::<i32>().ok())
        .unwrap_or(0);

    let mut measure = Measure {
        number,
        ..Default::default()
    };

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "attributes" => merge_attributes(&mut measure, parse_attributes(&child)),
            "note" => measure.notes.push(parse_note(&child)),
            "harmony" => measure.harmonies.push(parse_harmony(&child)),
            "barline" => measure.barlines.push(parse_barline(&child)),
            "direction" => {
                if let Some(dir) = parse_direction(&child) {
                    measure.directions.push(dir);
                }
            }
            _ => {}
        }
    }

    measure
}

/// A measure may hold several `<attributes>` blocks; later values win
/// field by field.
fn merge_attributes(measure: &mut Measure, incoming: Attributes) {
    match measure.attributes.as_mut() {
        None => measure.attributes = Some(incoming),
        Some(existing) => {
            if incoming.divisions.is_some() {
                existing.divisions = incoming.divisions;
            }
            if incoming.key.is_some() {
                existing.key = incoming.key;
            }
            if incoming.time.is_some() {
                existing.time = incoming.time;
            }
        }
    }
}

// ─── Attributes ──────────────────────────────────────────────────────

fn parse_attributes(node: &Node) -> Attributes {
    let mut attrs = Attributes::default();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "divisions" => attrs.divisions = parse_i32(&child),
            "key" => attrs.key = Some(parse_key(&child)),
            "time" => attrs.time = parse_time(&child),
            _ => {}
        }
    }

    attrs
}

fn parse_key(node: &Node) -> Key {
    let mut key = Key {
        fifths: 0,
        mode: None,
    };
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "fifths" => key.fifths = parse_i32(&child).unwrap_or(0),
            "mode" => key.mode = non_empty_text(&child),
            _ => {}
        }
    }
    key
}

/// `<senza-misura>` and unparseable composite meters carry no signature.
fn parse_time(node: &Node) -> Option<TimeSignature> {
    let mut beats = None;
    let mut beat_type = None;
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "beats" => beats = parse_i32(&child),
            "beat-type" => beat_type = parse_i32(&child),
            _ => {}
        }
    }
    Some(TimeSignature {
        beats: beats?,
        beat_type: beat_type?,
    })
}

// ─── Note ────────────────────────────────────────────────────────────

fn parse_note(node: &Node) -> Note {
    let mut note = Note::default();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "pitch" => note.pitch = Some(parse_pitch(&child)),
            "duration" => note.duration = parse_i32(&child).unwrap_or(0),
            "rest" => note.rest = true,
            "grace" => note.grace = true,
            "chord" => note.chord = true,
            _ => {}
        }
    }

    note
}

fn parse_pitch(node: &Node) -> Pitch {
    let mut pitch = Pitch {
        step: "C".to_string(),
        octave: 4,
        alter: None,
    };
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "step" => {
                pitch.step = child.text().unwrap_or("C").trim().to_string();
            }
            "octave" => pitch.octave = parse_i32(&child).unwrap_or(4),
            "alter" => pitch.alter = parse_f64(&child),
            _ => {}
        }
    }
    pitch
}

// ─── Harmony ─────────────────────────────────────────────────────────

fn parse_harmony(node: &Node) -> Harmony {
    let mut root = HarmonyRoot {
        step: "C".to_string(),
        alter: None,
    };
    let mut kind = "major".to_string();
    let mut kind_text = None;
    let mut bass = None;
    let mut degrees = Vec::new();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "root" => {
                for rc in child.children().filter(|n| n.is_element()) {
                    match rc.tag_name().name() {
                        "root-step" => {
                            root.step = rc.text().unwrap_or("C").trim().to_string();
                        }
                        "root-alter" => root.alter = parse_f64(&rc),
                        _ => {}
                    }
                }
            }
            "kind" => {
                kind = child.text().unwrap_or("major").trim().to_string();
                kind_text = child
                    .attribute("text")
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty());
            }
            "bass" => {
                let mut b = HarmonyRoot {
                    step: "C".to_string(),
                    alter: None,
                };
                for bc in child.children().filter(|n| n.is_element()) {
                    match bc.tag_name().name() {
                        "bass-step" => {
                            b.step = bc.text().unwrap_or("C").trim().to_string();
                        }
                        "bass-alter" => b.alter = parse_f64(&bc),
                        _ => {}
                    }
                }
                bass = Some(b);
            }
            "degree" => {
                if let Some(degree) = parse_degree(&child) {
                    degrees.push(degree);
                }
            }
            _ => {}
        }
    }

    let figure = match kind.as_str() {
        "none" => Some("N.C.".to_string()),
        "other" => kind_text.as_ref().map(|t| format!("{}{t}", root.name())),
        _ => None,
    };

    Harmony {
        root,
        kind,
        kind_text,
        bass,
        degrees,
        figure,
    }
}

fn parse_degree(node: &Node) -> Option<Degree> {
    let mut value = None;
    let mut alter = 0;
    let mut degree_type = None;
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "degree-value" => value = parse_i32(&child),
            "degree-alter" => alter = parse_f64(&child).map_or(0, |a| a.round() as i32),
            "degree-type" => {
                degree_type = match child.text().unwrap_or("").trim() {
                    "add" => Some(DegreeType::Add),
                    "alter" => Some(DegreeType::Alter),
                    "subtract" => Some(DegreeType::Subtract),
                    _ => None,
                };
            }
            _ => {}
        }
    }
    Some(Degree {
        value: value?,
        alter,
        degree_type: degree_type?,
    })
}

// ─── Barline ─────────────────────────────────────────────────────────

fn parse_barline(node: &Node) -> Barline {
    let location = node
        .attribute("location")
        .and_then(BarLocation::parse)
        .unwrap_or(BarLocation::Right);
    let mut barline = Barline {
        location,
        style: None,
        repeat: None,
        ending: None,
    };

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "bar-style" => {
                barline.style = child.text().and_then(BarStyle::parse);
            }
            "repeat" => {
                barline.repeat = child
                    .attribute("direction")
                    .and_then(RepeatDirection::parse);
            }
            "ending" => {
                let number = child.attribute("number").unwrap_or("1").to_string();
                let ending_type = child.attribute("type").unwrap_or("start").to_string();
                barline.ending = Some(Ending {
                    number,
                    ending_type,
                    text: non_empty_text(&child),
                });
            }
            _ => {}
        }
    }

    barline
}

// ─── Direction ───────────────────────────────────────────────────────

fn parse_direction(node: &Node) -> Option<Direction> {
    let mut dir = Direction::default();
    let mut words: Vec<String> = Vec::new();

    let direction_types = node
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "direction-type");
    for dt_child in direction_types.flat_map(|c| c.children().filter(|n| n.is_element())) {
        match dt_child.tag_name().name() {
            "words" => {
                if let Some(text) = non_empty_text(&dt_child) {
                    words.push(text);
                }
            }
            "rehearsal" => {
                if dir.rehearsal.is_none() {
                    dir.rehearsal = non_empty_text(&dt_child);
                }
            }
            _ => {}
        }
    }

    if !words.is_empty() {
        dir.words = Some(words.join(" "));
    }

    // Signs and playback-only directions print nothing the chart can use.
    let has_content = dir.words.is_some() || dir.rehearsal.is_some();
    has_content.then_some(dir)
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn parse_i32(node: &Node) -> Option<i32> {
    node.text()?.trim().parse().ok()
}

fn parse_f64(node: &Node) -> Option<f64> {
    node.text()?.trim().parse().ok()
}

fn non_empty_text(node: &Node) -> Option<String> {
    node.text()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(measures: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="4.0">
  <work><work-title>Work Title</work-title></work>
  <identification><creator type="composer">Jane Doe</creator></identification>
  <part-list><score-part id="P1"><part-name>Piano</part-name></score-part></part-list>
  <part id="P1">{measures}</part>
</score-partwise>"#
        )
    }

    #[test]
    fn rejects_timewise_scores() {
        let err = parse_musicxml("<score-timewise/>").unwrap_err();
        assert!(err.contains("score-timewise"));
    }

    #[test]
    fn credit_title_overrides_work_title() {
        let xml = r#"<score-partwise>
  <work><work-title>Fallback</work-title></work>
  <credit page="1"><credit-type>title</credit-type><credit-words>Credited</credit-words></credit>
</score-partwise>"#;
        let score = parse_musicxml(xml).unwrap();
        assert_eq!(score.title.as_deref(), Some("Credited"));
    }

    #[test]
    fn parses_harmony_details() {
        let xml = wrap(
            r#"<measure number="1">
  <harmony>
    <root><root-step>B</root-step><root-alter>-1</root-alter></root>
    <kind text="m7">minor-seventh</kind>
    <bass><bass-step>F</bass-step></bass>
    <degree><degree-value>5</degree-value><degree-alter>-1</degree-alter><degree-type>alter</degree-type></degree>
  </harmony>
  <harmony><root><root-step>C</root-step></root><kind>none</kind></harmony>
</measure>"#,
        );
        let score = parse_musicxml(&xml).unwrap();
        let m = &score.parts[0].measures[0];
        assert_eq!(m.harmonies.len(), 2);
        let h = &m.harmonies[0];
        assert_eq!(h.root.name(), "Bb");
        assert_eq!(h.kind, "minor-seventh");
        assert_eq!(h.kind_text.as_deref(), Some("m7"));
        assert_eq!(h.bass.as_ref().map(|b| b.name()), Some("F".to_string()));
        assert_eq!(h.degrees.len(), 1);
        assert_eq!(h.degrees[0].degree_type, DegreeType::Alter);
        assert_eq!(m.harmonies[1].figure.as_deref(), Some("N.C."));
    }

    #[test]
    fn parses_barlines_into_enums() {
        let xml = wrap(
            r#"<measure number="1">
  <barline location="left"><bar-style>heavy-light</bar-style><repeat direction="forward"/></barline>
  <barline location="right"><bar-style>light-light</bar-style><ending number="1" type="start">1.</ending></barline>
</measure>"#,
        );
        let score = parse_musicxml(&xml).unwrap();
        let m = &score.parts[0].measures[0];
        assert_eq!(m.barlines[0].location, BarLocation::Left);
        assert_eq!(m.barlines[0].style, Some(BarStyle::HeavyLight));
        assert_eq!(m.barlines[0].repeat, Some(RepeatDirection::Forward));
        assert_eq!(m.barlines[1].style, Some(BarStyle::LightLight));
        assert_eq!(
            m.barlines[1].ending.as_ref().and_then(|e| e.text.as_deref()),
            Some("1.")
        );
    }

    #[test]
    fn parses_directions_and_time() {
        let xml = wrap(
            r#"<measure number="1">
  <attributes><divisions>1</divisions><time><beats>3</beats><beat-type>4</beat-type></time></attributes>
  <direction placement="above"><direction-type><rehearsal>B</rehearsal></direction-type></direction>
  <direction><direction-type><words>D.S.</words><words>al Coda</words></direction-type></direction>
  <direction><direction-type><dynamics><f/></dynamics></direction-type></direction>
</measure>"#,
        );
        let score = parse_musicxml(&xml).unwrap();
        assert_eq!(score.title.as_deref(), Some("Work Title"));
        assert_eq!(score.composer.as_deref(), Some("Jane Doe"));
        let m = &score.parts[0].measures[0];
        assert_eq!(m.time_signature(), Some(TimeSignature { beats: 3, beat_type: 4 }));
        assert_eq!(m.directions.len(), 2);
        assert_eq!(m.directions[0].rehearsal.as_deref(), Some("B"));
        assert_eq!(m.directions[1].words.as_deref(), Some("D.S. al Coda"));
    }

    #[test]
    fn signs_and_sound_only_directions_are_dropped() {
        let xml = wrap(
            r#"<measure number="1">
  <direction><direction-type><segno/></direction-type><sound segno="s1"/></direction>
  <direction><direction-type><coda/></direction-type></direction>
  <direction><sound tempo="120" dacapo="yes"/></direction>
  <direction><direction-type><words>Fine</words></direction-type><sound fine="yes"/></direction>
</measure>"#,
        );
        let score = parse_musicxml(&xml).unwrap();
        let m = &score.parts[0].measures[0];
        assert_eq!(m.directions.len(), 1);
        assert_eq!(m.directions[0].words.as_deref(), Some("Fine"));
    }

    #[test]
    fn unlisted_part_is_kept() {
        let xml = r#"<score-partwise><part id="X"><measure number="1"/></part></score-partwise>"#;
        let score = parse_musicxml(xml).unwrap();
        assert_eq!(score.parts.len(), 1);
        assert_eq!(score.parts[0].id, "X");
        assert_eq!(score.parts[0].measures.len(), 1);
    }
}
