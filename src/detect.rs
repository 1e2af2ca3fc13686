//! Per-measure structural token detectors.
//!
//! Each detector looks at one measure in isolation. Cross-measure state
//! (the last emitted time signature, synthetic endings) is passed in by
//! the progression assembler.

use std::collections::HashMap;

use crate::model::{BarLocation, BarStyle, Measure, RepeatDirection, TimeSignature};
use crate::token::{Cue, Token};

/// Phrase table for staff-text cues, longest phrases first so a compound
/// cue claims its text before the bare `Fine`/`Coda` inside it.
const CUE_PHRASES: [(&str, Cue); 10] = [
    ("d.c. al fine", Cue::DcAlFine),
    ("dc al fine", Cue::DcAlFine),
    ("d.c. al coda", Cue::DcAlCoda),
    ("dc al coda", Cue::DcAlCoda),
    ("d.s. al fine", Cue::DsAlFine),
    ("ds al fine", Cue::DsAlFine),
    ("d.s. al coda", Cue::DsAlCoda),
    ("ds al coda", Cue::DsAlCoda),
    ("fine", Cue::Fine),
    ("coda", Cue::Coda),
];

/// Barline-derived tokens around one measure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarlineTokens {
    /// Emitted before the measure's chords (`{`, `[`)
    pub prefix: Vec<Token>,
    /// Emitted after the measure's bar separator (`}`, `]`)
    pub suffix: Vec<Token>,
}

/// `T<num><den>` when the measure declares a signature different from `last`.
pub fn time_signature_token(measure: &Measure, last: Option<TimeSignature>) -> Option<Token> {
    let ts = measure.time_signature()?;
    (Some(ts) != last).then_some(Token::TimeSignature(ts))
}

/// `*<Letter>` from the measure's first rehearsal mark.
pub fn rehearsal_token(measure: &Measure) -> Option<Token> {
    let label = measure
        .directions
        .iter()
        .find_map(|d| d.rehearsal.as_deref())?;
    let first = label.trim().chars().next()?;
    first
        .is_ascii_alphabetic()
        .then(|| Token::Rehearsal(first.to_ascii_uppercase()))
}

/// Ending number (1-3) from the first label that starts with a digit
/// the protocol can express.
pub fn explicit_ending(measure: &Measure) -> Option<u8> {
    measure
        .text_elements()
        .filter_map(|e| e.display_text())
        .find_map(|text| match text.trim_start().chars().next()? {
            '1' => Some(1),
            '2' => Some(2),
            '3' => Some(3),
            _ => None,
        })
}

/// Ending token for the measure at `index`: explicit label first, then
/// the synthetic map computed from repeat structure.
pub fn ending_token(
    measure: &Measure,
    index: usize,
    synthetic: &HashMap<usize, u8>,
) -> Option<Token> {
    explicit_ending(measure)
        .or_else(|| synthetic.get(&index).copied())
        .and_then(Token::ending)
}

/// Staff-text cues in order of discovery, each at most once per measure.
pub fn staff_text_tokens(measure: &Measure) -> Vec<Token> {
    let mut cues: Vec<Cue> = Vec::new();
    for text in measure.text_elements().filter_map(|e| e.display_text()) {
        for cue in cues_in_text(text) {
            if !cues.contains(&cue) {
                cues.push(cue);
            }
        }
    }
    cues.into_iter().map(Token::StaffText).collect()
}

/// Cues found in one text, ordered by position. Matched spans are blanked
/// so `Fine` inside "D.C. al Fine" is not reported on its own.
fn cues_in_text(text: &str) -> Vec<Cue> {
    let mut haystack = text.to_lowercase();
    let mut found: Vec<(usize, Cue)> = Vec::new();
    for (phrase, cue) in CUE_PHRASES {
        while let Some(pos) = haystack.find(phrase) {
            found.push((pos, cue));
            haystack.replace_range(pos..pos + phrase.len(), &" ".repeat(phrase.len()));
        }
    }
    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, cue)| cue).collect()
}

/// Repeat and double-bar tokens implied by the measure's barlines.
/// Each token appears at most once per edge.
pub fn barline_tokens(measure: &Measure) -> BarlineTokens {
    let mut tokens = BarlineTokens::default();
    for barline in &measure.barlines {
        match barline.location {
            BarLocation::Left => {
                if barline.repeat == Some(RepeatDirection::Forward)
                    || barline.style == Some(BarStyle::HeavyLight)
                {
                    push_once(&mut tokens.prefix, Token::RepeatOpen);
                }
                if barline.style == Some(BarStyle::LightLight) {
                    push_once(&mut tokens.prefix, Token::DoubleOpen);
                }
            }
            BarLocation::Right => {
                if barline.repeat == Some(RepeatDirection::Backward)
                    || barline.style == Some(BarStyle::LightHeavy)
                {
                    push_once(&mut tokens.suffix, Token::RepeatClose);
                }
                if barline.style == Some(BarStyle::LightLight) {
                    push_once(&mut tokens.suffix, Token::DoubleClose);
                }
            }
            BarLocation::Middle => {}
        }
    }
    tokens
}

/// Whether the measure closes a repeat with a backward repeat sign.
pub fn has_backward_repeat(measure: &Measure) -> bool {
    measure.barlines.iter().any(|b| {
        b.location == BarLocation::Right && b.repeat == Some(RepeatDirection::Backward)
    })
}

/// Whether the measure ends with a final (light-heavy) barline.
pub fn has_final_barline(measure: &Measure) -> bool {
    measure.barlines.iter().any(|b| {
        b.location == BarLocation::Right && b.style == Some(BarStyle::LightHeavy)
    })
}

fn push_once(tokens: &mut Vec<Token>, token: Token) {
    if !tokens.contains(&token) {
        tokens.push(token);
    }
}
