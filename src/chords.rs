//! Chord tokens for one measure.
//!
//! Chord symbols win over voiced chords: when a measure carries any
//! `<harmony>`, stacked notes are ignored so the same harmonic event is
//! not reported twice.

use std::collections::HashSet;

use crate::model::{Degree, DegreeType, Harmony, Measure, Pitch};

/// Ordered, deduplicated chord tokens of a measure.
pub fn measure_chord_tokens(measure: &Measure) -> Vec<String> {
    let tokens: Vec<String> = if measure.harmonies.is_empty() {
        measure
            .chords()
            .iter()
            .map(|pitches| stacked_chord_token(pitches))
            .collect()
    } else {
        measure.harmonies.iter().map(harmony_token).collect()
    };
    dedup_preserving_order(tokens)
}

/// Token for a chord symbol: figure (or root + quality), then the kind
/// text when it adds something, then a slash bass.
pub fn harmony_token(harmony: &Harmony) -> String {
    let root_name = harmony.root.name();
    let mut token = match harmony.figure.as_deref().map(str::trim) {
        Some(figure) if !figure.is_empty() => ascii_accidentals(figure),
        _ => format!(
            "{root_name}{}{}",
            kind_abbreviation(&harmony.kind),
            degree_suffix(&harmony.degrees)
        ),
    };

    if let Some(modifier) = harmony.kind_text.as_deref().map(str::trim) {
        let modifier = ascii_accidentals(modifier);
        if !modifier.is_empty() && !token.contains(&modifier) {
            token = format!("{token} {modifier}");
        }
    }

    if let Some(ref bass) = harmony.bass {
        let bass_name = bass.name();
        if !token.contains('/') && !bass_name.eq_ignore_ascii_case(&root_name) {
            token = format!("{token}/{bass_name}");
        }
    }

    token
}

/// Token for a voiced chord: its root if one stands out, else the
/// lowest sounding pitch.
pub fn stacked_chord_token(pitches: &[&Pitch]) -> String {
    let root = chord_root(pitches).or_else(|| lowest_pitch(pitches));
    root.map(Pitch::name).unwrap_or_default()
}

/// Figure-style abbreviation of a MusicXML chord kind.
fn kind_abbreviation(kind: &str) -> &str {
    match kind {
        "major" | "other" | "none" => "",
        "minor" => "m",
        "augmented" => "+",
        "diminished" => "dim",
        "dominant" => "7",
        "major-seventh" => "maj7",
        "minor-seventh" => "m7",
        "diminished-seventh" => "dim7",
        "augmented-seventh" => "+7",
        "half-diminished" => "m7b5",
        "major-minor" => "mMaj7",
        "major-sixth" => "6",
        "minor-sixth" => "m6",
        "dominant-ninth" => "9",
        "major-ninth" => "maj9",
        "minor-ninth" => "m9",
        "dominant-11th" => "11",
        "major-11th" => "maj11",
        "minor-11th" => "m11",
        "dominant-13th" => "13",
        "major-13th" => "maj13",
        "minor-13th" => "m13",
        "suspended-second" => "sus2",
        "suspended-fourth" => "sus4",
        "power" => "5",
        other => other,
    }
}

fn degree_suffix(degrees: &[Degree]) -> String {
    degrees
        .iter()
        .map(|d| {
            let accidental = if d.alter < 0 {
                "b".repeat(d.alter.unsigned_abs() as usize)
            } else {
                "#".repeat(d.alter as usize)
            };
            match d.degree_type {
                DegreeType::Add => format!(" add {accidental}{}", d.value),
                DegreeType::Alter => format!(" alter {accidental}{}", d.value),
                DegreeType::Subtract => format!(" subtract {}", d.value),
            }
        })
        .collect()
}

/// Replace display-only accidental glyphs with their ASCII spelling.
fn ascii_accidentals(text: &str) -> String {
    text.replace('\u{266d}', "b")
        .replace('\u{266f}', "#")
        .replace('\u{266e}', "")
}

/// The pitch over which the others stack in thirds, when exactly one
/// candidate fits best.
fn chord_root<'a>(pitches: &[&'a Pitch]) -> Option<&'a Pitch> {
    let mut candidates: Vec<&Pitch> = Vec::new();
    for &pitch in sorted_ascending(pitches).iter() {
        if !candidates.iter().any(|c| c.pitch_class() == pitch.pitch_class()) {
            candidates.push(pitch);
        }
    }
    if candidates.len() < 2 {
        return None;
    }

    let scored: Vec<(&Pitch, u32)> = candidates
        .iter()
        .map(|&candidate| {
            let score = candidates
                .iter()
                .map(|other| (other.pitch_class() + 12 - candidate.pitch_class()) % 12)
                .map(|interval| match interval {
                    3 | 4 | 7 | 10 | 11 => 2,
                    2 | 5 | 9 => 1,
                    _ => 0,
                })
                .sum::<u32>();
            (candidate, score)
        })
        .collect();

    let best = scored.iter().map(|(_, s)| *s).max()?;
    let mut winners = scored.iter().filter(|(_, s)| *s == best);
    match (winners.next(), winners.next()) {
        (Some((pitch, _)), None) => Some(*pitch),
        _ => None,
    }
}

fn lowest_pitch<'a>(pitches: &[&'a Pitch]) -> Option<&'a Pitch> {
    sorted_ascending(pitches).first().copied()
}

fn sorted_ascending<'a>(pitches: &[&'a Pitch]) -> Vec<&'a Pitch> {
    let mut sorted = pitches.to_vec();
    sorted.sort_by_key(|p| p.to_midi());
    sorted
}

fn dedup_preserving_order(tokens: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}
