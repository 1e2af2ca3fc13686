//! Whole-score key estimation.
//!
//! Pitch classes are weighted by sounding length (in quarter notes) and
//! correlated against the Krumhansl-Kessler major and minor profiles for
//! all 24 keys. Chord symbols contribute their chord tones, one quarter
//! each, so lead sheets without a melody still estimate.

use serde::Serialize;

use crate::model::{Harmony, Score};

/// Krumhansl-Kessler key profiles, indexed from the tonic.
const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Tonic names along the circle of fifths, from 7 flats to 10 sharps.
const CIRCLE_OF_FIFTHS: [&str; 18] = [
    "Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#", "G#",
    "D#", "A#",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    Major,
    Minor,
}

/// Result of key estimation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyEstimate {
    /// Tonic spelled with ASCII accidentals ("Bb", "F#")
    pub tonic: String,
    pub mode: Mode,
    /// Pearson correlation of the winning profile
    pub correlation: f64,
}

impl Score {
    /// Best-effort key of the whole score; `None` when nothing is pitched.
    pub fn estimate_key(&self) -> Option<KeyEstimate> {
        estimate_key(self)
    }
}

/// Estimate the key of a score.
pub fn estimate_key(score: &Score) -> Option<KeyEstimate> {
    let histogram = pitch_class_histogram(score);
    if histogram.iter().all(|&w| w <= 0.0) {
        return None;
    }

    let mut best: Option<(usize, Mode, f64)> = None;
    for tonic in 0..12 {
        for (mode, profile) in [(Mode::Major, &MAJOR_PROFILE), (Mode::Minor, &MINOR_PROFILE)] {
            let r = correlate(&histogram, profile, tonic);
            if best.map_or(true, |(_, _, b)| r > b) {
                best = Some((tonic, mode, r));
            }
        }
    }

    let (pitch_class, mode, correlation) = best?;
    let signature = score.key_signature().map(|k| k.fifths);
    let fifths = spelling_fifths(pitch_class, mode, signature);
    Some(KeyEstimate {
        tonic: tonic_name(fifths, mode).to_string(),
        mode,
        correlation,
    })
}

fn pitch_class_histogram(score: &Score) -> [f64; 12] {
    let mut histogram = [0.0; 12];
    for part in &score.parts {
        let mut divisions = 1;
        for measure in &part.measures {
            if let Some(d) = measure.attributes.as_ref().and_then(|a| a.divisions) {
                if d > 0 {
                    divisions = d;
                }
            }
            for note in measure.notes.iter().filter(|n| !n.grace) {
                if let Some(ref pitch) = note.pitch {
                    histogram[pitch.pitch_class()] +=
                        f64::from(note.duration.max(1)) / f64::from(divisions);
                }
            }
            for harmony in &measure.harmonies {
                let root = harmony.root.pitch_class();
                for interval in chord_intervals(harmony) {
                    histogram[(root + interval) % 12] += 1.0;
                }
            }
        }
    }
    histogram
}

/// Semitone offsets above the root for a chord kind.
fn chord_intervals(harmony: &Harmony) -> &'static [usize] {
    match harmony.kind.as_str() {
        "none" => &[],
        "major" => &[0, 4, 7],
        "minor" => &[0, 3, 7],
        "augmented" => &[0, 4, 8],
        "diminished" => &[0, 3, 6],
        "dominant" => &[0, 4, 7, 10],
        "major-seventh" => &[0, 4, 7, 11],
        "minor-seventh" => &[0, 3, 7, 10],
        "diminished-seventh" => &[0, 3, 6, 9],
        "augmented-seventh" => &[0, 4, 8, 10],
        "half-diminished" => &[0, 3, 6, 10],
        "major-minor" => &[0, 3, 7, 11],
        "major-sixth" => &[0, 4, 7, 9],
        "minor-sixth" => &[0, 3, 7, 9],
        "dominant-ninth" => &[0, 4, 7, 10, 2],
        "major-ninth" => &[0, 4, 7, 11, 2],
        "minor-ninth" => &[0, 3, 7, 10, 2],
        "suspended-second" => &[0, 2, 7],
        "suspended-fourth" => &[0, 5, 7],
        "power" => &[0, 7],
        kind if kind.starts_with("minor") => &[0, 3, 7],
        _ => &[0, 4, 7],
    }
}

/// Pearson correlation between the histogram and a profile rotated to `tonic`.
fn correlate(histogram: &[f64; 12], profile: &[f64; 12], tonic: usize) -> f64 {
    let rotated: Vec<f64> = (0..12).map(|pc| profile[(pc + 12 - tonic) % 12]).collect();
    let mean_h = histogram.iter().sum::<f64>() / 12.0;
    let mean_p = rotated.iter().sum::<f64>() / 12.0;

    let mut cov = 0.0;
    let mut var_h = 0.0;
    let mut var_p = 0.0;
    for (h, p) in histogram.iter().zip(&rotated) {
        cov += (h - mean_h) * (p - mean_p);
        var_h += (h - mean_h).powi(2);
        var_p += (p - mean_p).powi(2);
    }
    let denom = (var_h * var_p).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        cov / denom
    }
}

fn tonic_pitch_class(fifths: i32, mode: Mode) -> usize {
    let offset = match mode {
        Mode::Major => 0,
        Mode::Minor => 9,
    };
    (fifths * 7 + offset).rem_euclid(12) as usize
}

/// Choose a key-signature position that spells the tonic. The score's own
/// signature wins when it agrees with the estimate.
fn spelling_fifths(pitch_class: usize, mode: Mode, signature: Option<i32>) -> i32 {
    if let Some(sig) = signature.filter(|s| (-7..=7).contains(s)) {
        if tonic_pitch_class(sig, mode) == pitch_class {
            return sig;
        }
    }
    (-6..=5)
        .find(|&f| tonic_pitch_class(f, mode) == pitch_class)
        .unwrap_or(0)
}

fn tonic_name(fifths: i32, mode: Mode) -> &'static str {
    let position = match mode {
        Mode::Major => fifths,
        Mode::Minor => fifths + 3,
    };
    CIRCLE_OF_FIFTHS[(position + 7).clamp(0, 17) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn note(step: &str, alter: Option<f64>, duration: i32) -> Note {
        Note {
            pitch: Some(Pitch { step: step.into(), octave: 4, alter }),
            duration,
            ..Default::default()
        }
    }

    fn score_of(notes: Vec<Note>, fifths: Option<i32>) -> Score {
        let mut part = Part::new("P1", "Melody");
        part.measures.push(Measure {
            attributes: Some(Attributes {
                divisions: Some(1),
                key: fifths.map(|f| Key { fifths: f, mode: None }),
                time: None,
            }),
            notes,
            ..Default::default()
        });
        let mut score = Score::new();
        score.parts.push(part);
        score
    }

    #[test]
    fn c_major_scale_estimates_c_major() {
        let notes = ["C", "D", "E", "F", "G", "A", "B", "C", "E", "G", "C"]
            .iter()
            .map(|s| note(s, None, 2))
            .collect();
        let key = estimate_key(&score_of(notes, Some(0))).unwrap();
        assert_eq!(key.tonic, "C");
        assert_eq!(key.mode, Mode::Major);
    }

    #[test]
    fn a_minor_arpeggios_estimate_a_minor() {
        let notes = vec![
            note("A", None, 4),
            note("C", None, 2),
            note("E", None, 2),
            note("A", None, 4),
            note("G", Some(1.0), 1),
            note("B", None, 1),
            note("E", None, 2),
            note("A", None, 4),
        ];
        let key = estimate_key(&score_of(notes, Some(0))).unwrap();
        assert_eq!(key.tonic, "A");
        assert_eq!(key.mode, Mode::Minor);
    }

    #[test]
    fn flat_keys_are_spelled_with_b() {
        let notes = vec![
            note("B", Some(-1.0), 4),
            note("D", None, 2),
            note("F", None, 2),
            note("E", Some(-1.0), 1),
            note("C", None, 1),
            note("A", None, 1),
            note("B", Some(-1.0), 4),
        ];
        let key = estimate_key(&score_of(notes, None)).unwrap();
        assert_eq!(key.tonic, "Bb");
        assert_eq!(key.mode, Mode::Major);
    }

    #[test]
    fn empty_score_has_no_key() {
        assert_eq!(estimate_key(&score_of(Vec::new(), Some(2))), None);
    }

    #[test]
    fn signature_decides_enharmonic_spelling() {
        assert_eq!(tonic_name(spelling_fifths(6, Mode::Major, Some(6)), Mode::Major), "F#");
        assert_eq!(tonic_name(spelling_fifths(6, Mode::Major, None), Mode::Major), "Gb");
        assert_eq!(tonic_name(spelling_fifths(3, Mode::Minor, None), Mode::Minor), "Eb");
        assert_eq!(tonic_name(spelling_fifths(9, Mode::Minor, Some(0)), Mode::Minor), "A");
    }
}
