//! Integration tests: encode the fixture scores in tests/data/ as chart URLs.

use percent_encoding::percent_decode_str;
use pretty_assertions::assert_eq;
use scorechart::{
    build_progression, chart_for_file, parse_file, score_to_irealpro_html,
    score_to_irealpro_raw_url, score_to_irealpro_url, ChartError, ChartOptions, Score,
};
use std::path::PathBuf;

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn load(name: &str) -> Score {
    parse_file(data_path(name)).unwrap_or_else(|e| panic!("Failed to parse {name}: {e}"))
}

fn fields(raw: &str) -> Vec<String> {
    raw.strip_prefix("irealbook://")
        .expect("chart URL scheme")
        .split('=')
        .map(String::from)
        .collect()
}

// ─── Endings without explicit repeats ───────────────────────────────

#[test]
fn lonely_road_raw_url() {
    let score = load("lonely-road.musicxml");
    let raw = score_to_irealpro_raw_url(&score, Some("Medium Swing")).unwrap();
    assert_eq!(
        raw,
        "irealbook://Lonely Road, The=Doe Jane Q=Medium Swing=C=n=\
         T44 { Cmaj7 | Am7 | } N1 Dm7 G7 | N2 Cmaj7 Z }"
    );
}

#[test]
fn lonely_road_closes_before_first_ending() {
    let score = load("lonely-road.musicxml");
    let progression = build_progression(&score.parts[0]);
    let tokens: Vec<&str> = progression.split(' ').collect();

    assert_eq!(tokens.iter().filter(|t| **t == "{").count(), 1);
    // One forced close before the endings, one from the final barline.
    assert_eq!(tokens.iter().filter(|t| **t == "}").count(), 2);
    let close = tokens.iter().position(|t| *t == "}").unwrap();
    assert_eq!(tokens[close - 1], "|");
    assert_eq!(tokens[close + 1], "N1");
    assert_eq!(tokens.last(), Some(&"}"));
}

// ─── Repeats, double bars, rehearsal marks, cues ────────────────────

#[test]
fn blue_window_progression() {
    let score = load("blue-window.musicxml");
    assert_eq!(
        build_progression(&score.parts[0]),
        "T34 *A { F | C7 | } N1 Bb | N2 F | ] T44 *B N3 <D.S. al Coda> [ Gm7 C7 Z }"
    );
}

#[test]
fn blue_window_header_fields() {
    let score = load("blue-window.musicxml");
    let raw = score_to_irealpro_raw_url(&score, None).unwrap();
    let fields = fields(&raw);
    assert_eq!(fields[..5].to_vec(), vec!["Blue Window", "Monk", "Unknown", "F", "n"]);
}

// ─── Voiced chords ──────────────────────────────────────────────────

#[test]
fn piano_voicings_select_the_chord_part() {
    let score = load("piano-voicings.musicxml");
    let raw = score_to_irealpro_raw_url(&score, Some("Ballad")).unwrap();
    assert_eq!(raw, "irealbook://Untitled=Unknown=Ballad=G=n=T44 C | G Z }");
}

// ─── Failures ───────────────────────────────────────────────────────

#[test]
fn no_chords_fails_in_every_form() {
    let score = load("no-chords.musicxml");
    for result in [
        score_to_irealpro_url(&score, None),
        score_to_irealpro_raw_url(&score, None),
        score_to_irealpro_html(&score, None),
    ] {
        let err = result.unwrap_err();
        assert!(matches!(err, ChartError::NoChords));
        assert_eq!(err.to_string(), "No chords found in the score.");
    }
}

#[test]
fn unreadable_file_reports_path() {
    let err = chart_for_file(data_path("missing.musicxml"), &ChartOptions::default()).unwrap_err();
    assert!(matches!(err, ChartError::Read { .. }));
    assert!(err.to_string().contains("missing.musicxml"));
}

// ─── Laws over every chord-bearing fixture ──────────────────────────

const CHORD_FIXTURES: [&str; 3] = [
    "lonely-road.musicxml",
    "blue-window.musicxml",
    "piano-voicings.musicxml",
];

#[test]
fn encoded_urls_decode_to_six_fields() {
    for name in CHORD_FIXTURES {
        let score = load(name);
        let encoded = score_to_irealpro_url(&score, Some("Bossa Nova")).unwrap();
        assert!(!encoded.contains(' '), "{name}: unencoded space");
        assert!(!encoded.contains('='), "{name}: unencoded separator");

        let decoded = percent_decode_str(&encoded).decode_utf8().unwrap().into_owned();
        assert_eq!(decoded, score_to_irealpro_raw_url(&score, Some("Bossa Nova")).unwrap());
        let fields = fields(&decoded);
        assert_eq!(fields.len(), 6, "{name}");
        assert_eq!(fields[4], "n", "{name}");
    }
}

#[test]
fn one_bar_token_per_measure_and_final_bar_last() {
    for name in CHORD_FIXTURES {
        let score = load(name);
        let part = score.parts.iter().find(|p| p.has_chords()).unwrap();
        let progression = build_progression(part);
        let bars: Vec<&str> = progression
            .split(' ')
            .filter(|t| *t == "|" || *t == "Z")
            .collect();
        assert_eq!(bars.len(), part.measures.len(), "{name}");
        assert_eq!(bars.last(), Some(&"Z"), "{name}");
        assert_eq!(bars.iter().filter(|t| **t == "Z").count(), 1, "{name}");
    }
}

#[test]
fn encoding_is_idempotent() {
    for name in CHORD_FIXTURES {
        let score = load(name);
        assert_eq!(
            score_to_irealpro_url(&score, None).unwrap(),
            score_to_irealpro_url(&score, None).unwrap(),
            "{name}"
        );
    }
}

#[test]
fn html_anchor_wraps_encoded_url() {
    let score = load("lonely-road.musicxml");
    let html = score_to_irealpro_html(&score, None).unwrap();
    let url = score_to_irealpro_url(&score, None).unwrap();
    assert_eq!(html, format!(r#"<a href="{url}">Lonely Road, The</a>"#));
}
