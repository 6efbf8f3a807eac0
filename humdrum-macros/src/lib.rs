use proc_macro::TokenStream;
use quote::quote;
use syn::{LitStr, parse_macro_input};

/// Turns a note name into its MIDI note number at compile time.
///
/// The expansion is a plain `u8` literal, so it can be used anywhere a note
/// number is expected, including `const` items and match arms.
///
/// # Format
///
/// `<pitch>[octave]` where:
/// - `pitch` is one of C, D, E, F, G, A, B with an optional `#` or `b`
/// - `octave` is optional and defaults to 4; when given it must be -1 to 9
///
/// B# and Cb belong to the neighbouring octave, so `B#4` is `C5`. Names above
/// G9 (MIDI 127) are rejected.
///
/// # Examples
///
/// ```ignore
/// use humdrum::note;
///
/// assert_eq!(note!("C4"), 60);
/// assert_eq!(note!("A"), 69);
/// assert_eq!(note!("Bb3"), 58);
/// ```
#[proc_macro]
pub fn note(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as LitStr);
    let note_str = input.value();

    let expanded = match parse_note(&note_str).and_then(|(pitch, octave)| to_midi(pitch, octave)) {
        Ok(midi_note) => quote! { #midi_note },
        Err(e) => {
            let error_msg = format!("Invalid note string '{}': {}", note_str, e);
            quote! { compile_error!(#error_msg) }
        }
    };

    TokenStream::from(expanded)
}

#[derive(Debug, Clone, Copy)]
enum Pitch {
    C = 0,
    CSharp = 1,
    D = 2,
    DSharp = 3,
    E = 4,
    F = 5,
    FSharp = 6,
    G = 7,
    GSharp = 8,
    A = 9,
    ASharp = 10,
    B = 11,
}

/// Parses a pitch name. The second value shifts the octave for the two
/// spellings that cross an octave boundary, B# and Cb.
fn parse_pitch(s: &str) -> Result<(Pitch, i8), String> {
    let s = s.to_uppercase();
    let pitch = match s.as_str() {
        "B#" => return Ok((Pitch::C, 1)),
        "CB" => return Ok((Pitch::B, -1)),
        "C" => Pitch::C,
        "C#" | "DB" => Pitch::CSharp,
        "D" => Pitch::D,
        "D#" | "EB" => Pitch::DSharp,
        "E" | "FB" => Pitch::E,
        "F" | "E#" => Pitch::F,
        "F#" | "GB" => Pitch::FSharp,
        "G" => Pitch::G,
        "G#" | "AB" => Pitch::GSharp,
        "A" => Pitch::A,
        "A#" | "BB" => Pitch::ASharp,
        "B" => Pitch::B,
        _ => return Err(format!("invalid pitch '{}'", s)),
    };
    Ok((pitch, 0))
}

fn parse_note(s: &str) -> Result<(Pitch, i8), String> {
    if s.is_empty() {
        return Err("empty string".to_string());
    }

    let octave_start = s.chars().position(|c| c.is_ascii_digit() || c == '-');

    let (pitch_str, octave) = match octave_start {
        Some(0) => return Err("string starts with number".to_string()),
        Some(pos) => {
            let octave_str = &s[pos..];
            let octave = octave_str
                .parse::<i8>()
                .map_err(|_| format!("invalid octave '{}'", octave_str))?;

            if !(-1..=9).contains(&octave) {
                return Err(format!("octave {} out of range (-1 to 9)", octave));
            }

            (&s[..pos], octave)
        }
        None => (s, 4),
    };

    let (pitch, shift) = parse_pitch(pitch_str)?;
    Ok((pitch, octave + shift))
}

fn to_midi(pitch: Pitch, octave: i8) -> Result<u8, String> {
    let midi = (i16::from(octave) + 1) * 12 + pitch as i16;
    u8::try_from(midi)
        .ok()
        .filter(|n| *n <= 127)
        .ok_or_else(|| format!("note number {} is outside the MIDI range", midi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pitch() {
        assert!(matches!(parse_pitch("C"), Ok((Pitch::C, 0))));
        assert!(matches!(parse_pitch("c#"), Ok((Pitch::CSharp, 0))));
        assert!(matches!(parse_pitch("Db"), Ok((Pitch::CSharp, 0))));
        assert!(parse_pitch("H").is_err());
    }

    #[test]
    fn test_enharmonics_across_octave_boundary() {
        let (pitch, octave) = parse_note("B#4").unwrap();
        assert_eq!(to_midi(pitch, octave), Ok(72));
        let (pitch, octave) = parse_note("Cb4").unwrap();
        assert_eq!(to_midi(pitch, octave), Ok(59));

        let (pitch, octave) = parse_note("Cb-1").unwrap();
        assert!(to_midi(pitch, octave).is_err());
        let (pitch, octave) = parse_note("B#9").unwrap();
        assert!(to_midi(pitch, octave).is_err());
    }

    #[test]
    fn test_parse_note() {
        let (pitch, octave) = parse_note("C4").unwrap();
        assert!(matches!(pitch, Pitch::C));
        assert_eq!(octave, 4);

        let (_, octave) = parse_note("G").unwrap();
        assert_eq!(octave, 4);

        let (pitch, octave) = parse_note("F#-1").unwrap();
        assert!(matches!(pitch, Pitch::FSharp));
        assert_eq!(octave, -1);

        assert!(parse_note("").is_err());
        assert!(parse_note("4").is_err());
        assert!(parse_note("C10").is_err());
    }

    #[test]
    fn test_midi_range() {
        assert_eq!(to_midi(Pitch::C, 4), Ok(60));
        assert_eq!(to_midi(Pitch::A, 4), Ok(69));
        assert_eq!(to_midi(Pitch::C, -1), Ok(0));
        assert_eq!(to_midi(Pitch::G, 9), Ok(127));
        assert!(to_midi(Pitch::GSharp, 9).is_err());
    }
}
