//! Chart-protocol tokens and their textual form.

use std::fmt;

use crate::model::TimeSignature;

/// A recognised performance direction, printed as `<phrase>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    DcAlFine,
    DcAlCoda,
    DsAlFine,
    DsAlCoda,
    Fine,
    Coda,
}

impl Cue {
    pub fn phrase(self) -> &'static str {
        match self {
            Cue::DcAlFine => "D.C. al Fine",
            Cue::DcAlCoda => "D.C. al Coda",
            Cue::DsAlFine => "D.S. al Fine",
            Cue::DsAlCoda => "D.S. al Coda",
            Cue::Fine => "Fine",
            Cue::Coda => "Coda",
        }
    }
}

/// One unit of a progression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// The chords of one measure, printed space-separated
    Chords(Vec<String>),
    /// `T<num><den>`
    TimeSignature(TimeSignature),
    /// `*<Letter>`
    Rehearsal(char),
    /// `N1`, `N2` or `N3`
    Ending(u8),
    StaffText(Cue),
    /// `{`
    RepeatOpen,
    /// `}`
    RepeatClose,
    /// `[`
    DoubleOpen,
    /// `]`
    DoubleClose,
    /// `|`
    Bar,
    /// `Z`
    FinalBar,
}

impl Token {
    /// Ending token for volta `n`; only 1-3 exist in the protocol.
    pub fn ending(n: u8) -> Option<Token> {
        (1..=3).contains(&n).then_some(Token::Ending(n))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Chords(chords) => write!(f, "{}", chords.join(" ")),
            Token::TimeSignature(ts) => write!(f, "T{}{}", ts.beats, ts.beat_type),
            Token::Rehearsal(letter) => write!(f, "*{letter}"),
            Token::Ending(n) => write!(f, "N{n}"),
            Token::StaffText(cue) => write!(f, "<{}>", cue.phrase()),
            Token::RepeatOpen => f.write_str("{"),
            Token::RepeatClose => f.write_str("}"),
            Token::DoubleOpen => f.write_str("["),
            Token::DoubleClose => f.write_str("]"),
            Token::Bar => f.write_str("|"),
            Token::FinalBar => f.write_str("Z"),
        }
    }
}

/// Join tokens with single spaces.
pub fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::to_string)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_protocol_text() {
        let tokens = vec![
            Token::TimeSignature(TimeSignature { beats: 3, beat_type: 4 }),
            Token::Rehearsal('A'),
            Token::Ending(2),
            Token::StaffText(Cue::DsAlCoda),
            Token::RepeatOpen,
            Token::Chords(vec!["Cmaj7".into(), "A7".into()]),
            Token::Bar,
            Token::RepeatClose,
            Token::FinalBar,
        ];
        assert_eq!(join_tokens(&tokens), "T34 *A N2 <D.S. al Coda> { Cmaj7 A7 | } Z");
    }

    #[test]
    fn endings_are_limited_to_three() {
        assert_eq!(Token::ending(3), Some(Token::Ending(3)));
        assert_eq!(Token::ending(0), None);
        assert_eq!(Token::ending(4), None);
    }
}
