//! Progression assembly: one forward pass over a part's measures that
//! merges per-measure chord and structural tokens into the chart-protocol
//! token stream.
//!
//! The pass runs in two steps, like a repeat unroller:
//! - Pre-scan the whole part once into a [`RepeatPlan`]: where the
//!   explicit endings are, where the first backward repeat sits, and
//!   which measures receive synthetic endings.
//! - Fold every measure into an [`Accumulator`] in a fixed token order,
//!   then rewrite the last bar separator into the final bar.
//!
//! Per measure the order is: time signature (if changed), rehearsal mark,
//! ending, staff-text cues, barline prefixes, chords, `|`, barline
//! suffixes.

use std::collections::HashMap;

use log::debug;

use crate::chords::measure_chord_tokens;
use crate::detect::{
    barline_tokens, ending_token, explicit_ending, has_backward_repeat, has_final_barline,
    rehearsal_token, staff_text_tokens, time_signature_token,
};
use crate::model::{Measure, Part, TimeSignature};
use crate::token::{join_tokens, Token};

/// Highest ending number the protocol can print.
const MAX_ENDING: u8 = 3;

/// Repeat and ending structure of a part, computed before the main pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepeatPlan {
    /// Measures whose labels carry an explicit 1st/2nd/3rd ending
    pub ending_indices: Vec<usize>,
    /// First measure closing with a backward repeat
    pub backward_repeat_index: Option<usize>,
    /// First explicit ending; set whenever `ending_indices` is non-empty
    pub first_ending_index: Option<usize>,
    /// Endings inferred after the backward repeat when no labels exist
    pub synthetic_endings: HashMap<usize, u8>,
}

impl RepeatPlan {
    pub fn scan(measures: &[Measure]) -> Self {
        let mut plan = RepeatPlan::default();

        for (i, m) in measures.iter().enumerate() {
            if explicit_ending(m).is_some() {
                plan.ending_indices.push(i);
            }
            if plan.backward_repeat_index.is_none() && has_backward_repeat(m) {
                plan.backward_repeat_index = Some(i);
            }
        }

        plan.first_ending_index = plan.ending_indices.first().copied();

        if plan.first_ending_index.is_none() {
            if let Some(backward) = plan.backward_repeat_index {
                let mut number: u8 = 1;
                for (i, m) in measures.iter().enumerate().skip(backward + 1) {
                    if number > MAX_ENDING {
                        break;
                    }
                    plan.synthetic_endings.insert(i, number);
                    number += 1;
                    if has_final_barline(m) {
                        break;
                    }
                }
            }
        }

        plan
    }

    /// Endings were found, so the pass must make sure they sit inside a
    /// repeat bracket.
    pub fn fallback_repeat_needed(&self) -> bool {
        self.first_ending_index.is_some()
    }

    fn forces_open_at(&self, index: usize) -> bool {
        self.fallback_repeat_needed() && index == 0
    }

    /// The bar right before the first ending closes the repeated section.
    fn forces_close_at(&self, index: usize) -> bool {
        self.first_ending_index
            .is_some_and(|first| first > 0 && index == first - 1)
    }
}

/// State carried from one measure to the next.
#[derive(Debug, Clone, Default)]
struct Accumulator {
    tokens: Vec<Token>,
    last_ts: Option<TimeSignature>,
    added_forward_repeat: bool,
    added_backward_repeat: bool,
}

impl Accumulator {
    /// Start a progression, leading with the part's initial signature.
    fn new(initial_ts: Option<TimeSignature>) -> Self {
        let mut acc = Accumulator {
            last_ts: initial_ts,
            ..Default::default()
        };
        if let Some(ts) = initial_ts {
            acc.tokens.push(Token::TimeSignature(ts));
        }
        acc
    }

    fn push_measure(mut self, index: usize, measure: &Measure, plan: &RepeatPlan) -> Self {
        if let Some(token) = time_signature_token(measure, self.last_ts) {
            self.last_ts = measure.time_signature();
            self.tokens.push(token);
        }
        if let Some(token) = rehearsal_token(measure) {
            self.tokens.push(token);
        }
        if let Some(token) = ending_token(measure, index, &plan.synthetic_endings) {
            self.tokens.push(token);
        }
        self.tokens.extend(staff_text_tokens(measure));

        let mut edges = barline_tokens(measure);
        if !self.added_forward_repeat
            && plan.forces_open_at(index)
            && !edges.prefix.contains(&Token::RepeatOpen)
        {
            edges.prefix.insert(0, Token::RepeatOpen);
        }
        if !self.added_backward_repeat
            && plan.forces_close_at(index)
            && !edges.suffix.contains(&Token::RepeatClose)
        {
            edges.suffix.insert(0, Token::RepeatClose);
        }
        self.added_forward_repeat |= edges.prefix.contains(&Token::RepeatOpen);
        self.added_backward_repeat |= edges.suffix.contains(&Token::RepeatClose);

        self.tokens.extend(edges.prefix);
        let chords = measure_chord_tokens(measure);
        if !chords.is_empty() {
            self.tokens.push(Token::Chords(chords));
        }
        self.tokens.push(Token::Bar);
        self.tokens.extend(edges.suffix);
        self
    }

    /// Rewrite the last bar separator as the final bar, wherever it sits.
    fn finish(mut self) -> Vec<Token> {
        match self.tokens.iter().rposition(|t| *t == Token::Bar) {
            Some(last) => self.tokens[last] = Token::FinalBar,
            None => self.tokens.push(Token::FinalBar),
        }
        self.tokens
    }
}

/// The full token stream for a part.
pub fn progression_tokens(part: &Part) -> Vec<Token> {
    let plan = RepeatPlan::scan(&part.measures);
    debug!(
        "part '{}': {} measures, endings at {:?}, backward repeat at {:?}, {} synthetic endings",
        part.id,
        part.measures.len(),
        plan.ending_indices,
        plan.backward_repeat_index,
        plan.synthetic_endings.len()
    );

    part.measures
        .iter()
        .enumerate()
        .fold(
            Accumulator::new(part.initial_time_signature()),
            |acc, (index, measure)| acc.push_measure(index, measure, &plan),
        )
        .finish()
}

/// The progression text for a part: tokens joined by single spaces.
pub fn build_progression(part: &Part) -> String {
    join_tokens(&progression_tokens(part))
}
