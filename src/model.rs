//! Data model for representing a parsed MusicXML score.
//!
//! These structures capture the musical information the chart encoder
//! reads: measures, pitches, chord symbols, barlines and text directions.
//! Loosely typed MusicXML values (bar styles, barline locations, repeat
//! directions) are normalised into enums here, at the model boundary, so
//! nothing downstream has to compare strings.

use serde::{Deserialize, Serialize};

/// A complete musical score parsed from MusicXML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    /// Title of the piece
    pub title: Option<String>,
    /// Composer name
    pub composer: Option<String>,
    /// MusicXML version (e.g., "3.1", "4.0")
    pub version: Option<String>,
    /// Musical parts (instruments)
    pub parts: Vec<Part>,
}

/// A musical part (one instrument or voice).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Part identifier (e.g., "P1")
    pub id: String,
    /// Part name (e.g., "Piano")
    pub name: String,
    /// Ordered list of measures
    pub measures: Vec<Measure>,
}

/// A single measure (bar) of music.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Measure {
    /// Measure number
    pub number: i32,
    /// Attributes (key, time); only present when they change
    pub attributes: Option<Attributes>,
    /// Notes and rests in document order
    pub notes: Vec<Note>,
    /// Chord symbols
    pub harmonies: Vec<Harmony>,
    /// Barlines (repeat signs, double bars, endings)
    pub barlines: Vec<Barline>,
    /// Text directions and rehearsal marks
    pub directions: Vec<Direction>,
}

/// Musical attributes that may change at the start of a measure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attributes {
    /// Divisions per quarter note (determines duration resolution)
    pub divisions: Option<i32>,
    /// Key signature
    pub key: Option<Key>,
    /// Time signature
    pub time: Option<TimeSignature>,
}

/// Key signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    /// Number of sharps (positive) or flats (negative)
    pub fifths: i32,
    /// Mode (e.g., "major", "minor")
    pub mode: Option<String>,
}

/// Time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (e.g., 3 in 3/4)
    pub beats: i32,
    /// Denominator (e.g., 4 in 3/4)
    pub beat_type: i32,
}

/// A single note or rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Note {
    /// Pitch (None if this is a rest or unpitched)
    pub pitch: Option<Pitch>,
    /// Duration in divisions
    pub duration: i32,
    /// Whether this is a rest
    pub rest: bool,
    /// Whether this note sounds together with the previous note
    pub chord: bool,
    /// Grace notes carry no duration
    pub grace: bool,
}

/// Pitch of a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pitch {
    /// Note name: A, B, C, D, E, F, G
    pub step: String,
    /// Octave number (middle C = C4)
    pub octave: i32,
    /// Chromatic alteration: -1.0 = flat, 1.0 = sharp, 0.0 = natural
    pub alter: Option<f64>,
}

/// A chord symbol (harmony).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Harmony {
    /// Root note
    pub root: HarmonyRoot,
    /// MusicXML chord kind: "major", "minor-seventh", "dominant", ...
    pub kind: String,
    /// Verbose text printed for the kind (`<kind text="...">`)
    pub kind_text: Option<String>,
    /// Bass note (for slash chords)
    pub bass: Option<HarmonyRoot>,
    /// Added, altered or removed chord degrees
    pub degrees: Vec<Degree>,
    /// Literal chord figure, when the source spells the symbol out
    pub figure: Option<String>,
}

/// Root or bass note of a harmony.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarmonyRoot {
    /// Note name: A-G
    pub step: String,
    /// Alteration: -1 = flat, 1 = sharp
    pub alter: Option<f64>,
}

/// A chord degree modification (`<degree>`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Degree {
    /// Scale degree, e.g. 9 for an added ninth
    pub value: i32,
    /// Semitone alteration of the degree
    pub alter: i32,
    pub degree_type: DegreeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegreeType {
    Add,
    Alter,
    Subtract,
}

/// Where a barline sits on its measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarLocation {
    Left,
    Right,
    Middle,
}

/// Visual style of a barline (`<bar-style>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarStyle {
    Regular,
    Dotted,
    Dashed,
    Heavy,
    LightLight,
    LightHeavy,
    HeavyLight,
    HeavyHeavy,
    Tick,
    Short,
    None,
}

/// Direction of a repeat sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatDirection {
    Forward,
    Backward,
}

/// A barline (may include repeat signs and volta brackets).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barline {
    pub location: BarLocation,
    /// Visual style; `None` when absent or unrecognised
    pub style: Option<BarStyle>,
    /// Repeat sign
    pub repeat: Option<RepeatDirection>,
    /// Volta bracket (1st/2nd ending)
    pub ending: Option<Ending>,
}

/// A volta bracket (1st/2nd ending).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ending {
    /// Ending number(s), e.g., "1", "2", "1, 2"
    pub number: String,
    /// "start", "stop", or "discontinue"
    pub ending_type: String,
    /// Display text
    pub text: Option<String>,
}

/// A direction carrying free text or a rehearsal mark.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Direction {
    /// Free text (`<words>`); multiple words elements are joined by spaces
    pub words: Option<String>,
    /// Rehearsal mark label
    pub rehearsal: Option<String>,
}

/// Anything that carries a printed label the encoder may inspect.
pub trait HasDisplayText {
    fn display_text(&self) -> Option<&str>;
}

impl HasDisplayText for Direction {
    fn display_text(&self) -> Option<&str> {
        self.words.as_deref().or(self.rehearsal.as_deref())
    }
}

/// Only the start of a bracket prints a label; stop and discontinue
/// markers carry none.
impl HasDisplayText for Ending {
    fn display_text(&self) -> Option<&str> {
        if self.ending_type != "start" {
            return None;
        }
        match self.text.as_deref() {
            Some(t) if !t.trim().is_empty() => Some(t),
            _ => Some(self.number.as_str()),
        }
    }
}

impl Score {
    /// Create a new empty score.
    pub fn new() -> Self {
        Self {
            title: None,
            composer: None,
            version: None,
            parts: Vec::new(),
        }
    }

    /// Number of measures in the first part.
    pub fn measure_count(&self) -> usize {
        self.parts.first().map_or(0, |p| p.measures.len())
    }

    /// First key signature declared anywhere in the score.
    pub fn key_signature(&self) -> Option<&Key> {
        self.parts
            .iter()
            .flat_map(|p| p.measures.iter())
            .find_map(|m| m.attributes.as_ref().and_then(|a| a.key.as_ref()))
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}

impl Part {
    /// Create an empty part with the given id and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            measures: Vec::new(),
        }
    }

    /// The first time signature found in the part, if any.
    pub fn initial_time_signature(&self) -> Option<TimeSignature> {
        self.measures.iter().find_map(Measure::time_signature)
    }

    /// Whether any measure holds a chord symbol or a stacked-note chord.
    pub fn has_chords(&self) -> bool {
        self.measures
            .iter()
            .any(|m| !m.harmonies.is_empty() || !m.chords().is_empty())
    }
}

impl Measure {
    /// The time signature declared in this measure's attributes.
    pub fn time_signature(&self) -> Option<TimeSignature> {
        self.attributes.as_ref().and_then(|a| a.time)
    }

    /// Group notes into stacked chords.
    ///
    /// A chord starts at a pitched note and extends over the following
    /// notes flagged `chord`. Only groups with two or more pitches count.
    pub fn chords(&self) -> Vec<Vec<&Pitch>> {
        let mut groups: Vec<Vec<&Pitch>> = Vec::new();
        let mut current: Vec<&Pitch> = Vec::new();
        for note in &self.notes {
            if !note.chord && !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            if let Some(ref pitch) = note.pitch {
                current.push(pitch);
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }
        groups.retain(|g| g.len() >= 2);
        groups
    }

    /// Every element of this measure that carries a label, in traversal
    /// order: volta brackets first, then directions.
    pub fn text_elements(&self) -> impl Iterator<Item = &dyn HasDisplayText> + '_ {
        let endings = self
            .barlines
            .iter()
            .filter_map(|b| b.ending.as_ref())
            .map(|e| e as &dyn HasDisplayText);
        let directions = self.directions.iter().map(|d| d as &dyn HasDisplayText);
        endings.chain(directions)
    }
}

impl Pitch {
    /// Convert pitch to MIDI note number.
    /// Middle C (C4) = 60.
    pub fn to_midi(&self) -> i32 {
        (self.octave + 1) * 12 + step_semitone(&self.step) + alter_semitones(self.alter)
    }

    /// Pitch class 0-11 (C = 0).
    pub fn pitch_class(&self) -> usize {
        (step_semitone(&self.step) + alter_semitones(self.alter)).rem_euclid(12) as usize
    }

    /// Spelled name without octave, flats as `b` (e.g. "Bb", "F#").
    pub fn name(&self) -> String {
        note_name(&self.step, self.alter)
    }
}

impl HarmonyRoot {
    pub fn name(&self) -> String {
        note_name(&self.step, self.alter)
    }

    pub fn pitch_class(&self) -> usize {
        (step_semitone(&self.step) + alter_semitones(self.alter)).rem_euclid(12) as usize
    }
}

impl BarLocation {
    /// Parse a location value; unknown values are absent.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_enum_value(raw).as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "middle" => Some(Self::Middle),
            _ => None,
        }
    }
}

impl BarStyle {
    /// Parse a `<bar-style>` value; unknown values are absent.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_enum_value(raw).as_str() {
            "regular" => Some(Self::Regular),
            "dotted" => Some(Self::Dotted),
            "dashed" => Some(Self::Dashed),
            "heavy" => Some(Self::Heavy),
            "light-light" => Some(Self::LightLight),
            "light-heavy" => Some(Self::LightHeavy),
            "heavy-light" => Some(Self::HeavyLight),
            "heavy-heavy" => Some(Self::HeavyHeavy),
            "tick" => Some(Self::Tick),
            "short" => Some(Self::Short),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl RepeatDirection {
    /// Parse a repeat direction; "start"/"end" are accepted as synonyms.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_enum_value(raw).as_str() {
            "forward" | "start" => Some(Self::Forward),
            "backward" | "end" => Some(Self::Backward),
            _ => None,
        }
    }
}

/// Lower-case, drop any `Namespace.` wrapper prefix, `_` → `-`.
fn normalize_enum_value(raw: &str) -> String {
    let trimmed = raw.trim();
    let bare = trimmed.rsplit('.').next().unwrap_or(trimmed);
    bare.to_lowercase().replace('_', "-")
}

/// Spell a note name with ASCII accidentals: flats as `b`, sharps as `#`.
pub fn note_name(step: &str, alter: Option<f64>) -> String {
    let accidental = match alter_semitones(alter) {
        -2 => "bb",
        -1 => "b",
        1 => "#",
        2 => "##",
        _ => "",
    };
    format!("{}{}", step.trim().to_uppercase(), accidental)
}

fn step_semitone(step: &str) -> i32 {
    match step.trim().to_uppercase().as_str() {
        "C" => 0,
        "D" => 2,
        "E" => 4,
        "F" => 5,
        "G" => 7,
        "A" => 9,
        "B" => 11,
        _ => 0,
    }
}

fn alter_semitones(alter: Option<f64>) -> i32 {
    alter.map_or(0, |a| a.round() as i32)
}
