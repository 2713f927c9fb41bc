//! # Arabic Contextual Joining
//!
//! Maps Arabic letters in logical order to their presentation forms
//! (isolated, final, initial, medial) and folds lam-alef pairs into their
//! mandatory ligatures. The output stays in logical order; reversal into
//! visual order happens in the caller once runs are known.
//!
//! Joining follows the Unicode joining types: dual-joining letters connect on
//! both sides, right-joining letters only to the preceding letter, harakat
//! are transparent and skipped when looking for neighbours.

use crate::error::{InvoiceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joining {
    /// Connects to both neighbours.
    Dual,
    /// Connects only to the preceding letter.
    Right,
    /// Never connects.
    NonJoining,
    /// Tatweel and ZWJ: connects both ways, has no forms of its own.
    Causing,
    /// Harakat and other marks.
    Transparent,
}

/// (letter, isolated presentation form, joining type). Final, initial and
/// medial forms follow the isolated form consecutively.
#[rustfmt::skip]
const FORMS: &[(char, u32, Joining)] = &[
    ('\u{0621}', 0xFE80, Joining::NonJoining), // hamza
    ('\u{0622}', 0xFE81, Joining::Right),      // alef with madda
    ('\u{0623}', 0xFE83, Joining::Right),      // alef with hamza above
    ('\u{0624}', 0xFE85, Joining::Right),      // waw with hamza
    ('\u{0625}', 0xFE87, Joining::Right),      // alef with hamza below
    ('\u{0626}', 0xFE89, Joining::Dual),       // yeh with hamza
    ('\u{0627}', 0xFE8D, Joining::Right),      // alef
    ('\u{0628}', 0xFE8F, Joining::Dual),       // beh
    ('\u{0629}', 0xFE93, Joining::Right),      // teh marbuta
    ('\u{062A}', 0xFE95, Joining::Dual),       // teh
    ('\u{062B}', 0xFE99, Joining::Dual),       // theh
    ('\u{062C}', 0xFE9D, Joining::Dual),       // jeem
    ('\u{062D}', 0xFEA1, Joining::Dual),       // hah
    ('\u{062E}', 0xFEA5, Joining::Dual),       // khah
    ('\u{062F}', 0xFEA9, Joining::Right),      // dal
    ('\u{0630}', 0xFEAB, Joining::Right),      // thal
    ('\u{0631}', 0xFEAD, Joining::Right),      // reh
    ('\u{0632}', 0xFEAF, Joining::Right),      // zain
    ('\u{0633}', 0xFEB1, Joining::Dual),       // seen
    ('\u{0634}', 0xFEB5, Joining::Dual),       // sheen
    ('\u{0635}', 0xFEB9, Joining::Dual),       // sad
    ('\u{0636}', 0xFEBD, Joining::Dual),       // dad
    ('\u{0637}', 0xFEC1, Joining::Dual),       // tah
    ('\u{0638}', 0xFEC5, Joining::Dual),       // zah
    ('\u{0639}', 0xFEC9, Joining::Dual),       // ain
    ('\u{063A}', 0xFECD, Joining::Dual),       // ghain
    ('\u{0641}', 0xFED1, Joining::Dual),       // feh
    ('\u{0642}', 0xFED5, Joining::Dual),       // qaf
    ('\u{0643}', 0xFED9, Joining::Dual),       // kaf
    ('\u{0644}', 0xFEDD, Joining::Dual),       // lam
    ('\u{0645}', 0xFEE1, Joining::Dual),       // meem
    ('\u{0646}', 0xFEE5, Joining::Dual),       // noon
    ('\u{0647}', 0xFEE9, Joining::Dual),       // heh
    ('\u{0648}', 0xFEED, Joining::Right),      // waw
    ('\u{0649}', 0xFEEF, Joining::Right),      // alef maksura
    ('\u{064A}', 0xFEF1, Joining::Dual),       // yeh
    ('\u{067E}', 0xFB56, Joining::Dual),       // peh
    ('\u{0686}', 0xFB7A, Joining::Dual),       // tcheh
    ('\u{0698}', 0xFB8A, Joining::Right),      // jeh
    ('\u{06A9}', 0xFB8E, Joining::Dual),       // keheh
    ('\u{06AF}', 0xFB92, Joining::Dual),       // gaf
    ('\u{06CC}', 0xFBFC, Joining::Dual),       // farsi yeh
];

const LAM: char = '\u{0644}';

/// Lam-alef ligatures: (alef variant, isolated form). The final form follows.
const LAM_ALEF: [(char, u32); 4] = [
    ('\u{0622}', 0xFEF5),
    ('\u{0623}', 0xFEF7),
    ('\u{0625}', 0xFEF9),
    ('\u{0627}', 0xFEFB),
];

fn lookup(ch: char) -> Option<(u32, Joining)> {
    FORMS
        .binary_search_by_key(&ch, |(c, _, _)| *c)
        .ok()
        .map(|i| (FORMS[i].1, FORMS[i].2))
}

fn joining(ch: char) -> Joining {
    if let Some((_, j)) = lookup(ch) {
        return j;
    }
    match ch {
        '\u{0640}' | '\u{200D}' => Joining::Causing,
        '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{06D6}'..='\u{06ED}' => Joining::Transparent,
        _ => Joining::NonJoining,
    }
}

fn joins_forward(j: Joining) -> bool {
    matches!(j, Joining::Dual | Joining::Causing)
}

fn joins_backward(j: Joining) -> bool {
    matches!(j, Joining::Dual | Joining::Right | Joining::Causing)
}

/// True for characters in the Arabic blocks, including presentation forms.
pub fn is_arabic(ch: char) -> bool {
    matches!(ch,
        '\u{0600}'..='\u{06FF}' |
        '\u{0750}'..='\u{077F}' |
        '\u{08A0}'..='\u{08FF}' |
        '\u{FB50}'..='\u{FDFF}' |
        '\u{FE70}'..='\u{FEFF}'
    )
}

/// Reject segments the joiner cannot interpret: control characters and
/// marks with nothing to attach to.
fn check_segment(chars: &[char]) -> Result<()> {
    if let Some(ch) = chars.iter().find(|c| c.is_control()) {
        return Err(InvoiceError::ShapingFailure {
            text: chars.iter().collect(),
            reason: format!("control character U+{:04X} in Arabic run", *ch as u32),
        });
    }
    if let Some(first) = chars.iter().find(|c| !c.is_whitespace()) {
        if joining(*first) == Joining::Transparent {
            return Err(InvoiceError::ShapingFailure {
                text: chars.iter().collect(),
                reason: format!("mark U+{:04X} has no base letter", *first as u32),
            });
        }
    }
    Ok(())
}

/// Apply contextual forms to a run in logical order.
///
/// Returns each output character paired with the index of the input
/// character it came from. A lam-alef ligature maps to the lam's index and
/// consumes the alef.
pub fn reshape(chars: &[char]) -> Result<Vec<(char, usize)>> {
    check_segment(chars)?;

    let types: Vec<Joining> = chars.iter().map(|c| joining(*c)).collect();
    let mut out = Vec::with_capacity(chars.len());

    // Neighbour lookups skip transparent marks.
    let prev_joining = |i: usize| -> Option<Joining> {
        types[..i]
            .iter()
            .rev()
            .copied()
            .find(|j| *j != Joining::Transparent)
    };
    let next_index = |i: usize| -> Option<usize> {
        (i + 1..chars.len()).find(|k| types[*k] != Joining::Transparent)
    };

    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        let prev_connects = prev_joining(i).is_some_and(joins_forward);

        if ch == LAM {
            if let Some(k) = next_index(i) {
                if let Some((_, iso)) = LAM_ALEF.iter().find(|(alef, _)| *alef == chars[k]) {
                    let form = if prev_connects { iso + 1 } else { *iso };
                    out.push((char::from_u32(form).unwrap_or(ch), i));
                    // Marks between lam and alef stay attached.
                    for (m, mark) in chars.iter().enumerate().take(k).skip(i + 1) {
                        out.push((*mark, m));
                    }
                    i = k + 1;
                    continue;
                }
            }
        }

        let shaped = match lookup(ch) {
            Some((iso, Joining::Dual)) => {
                let next_connects = next_index(i).is_some_and(|k| joins_backward(types[k]));
                let offset = match (prev_connects, next_connects) {
                    (true, true) => 3,
                    (false, true) => 2,
                    (true, false) => 1,
                    (false, false) => 0,
                };
                char::from_u32(iso + offset).unwrap_or(ch)
            }
            Some((iso, Joining::Right)) => {
                let offset = if prev_connects { 1 } else { 0 };
                char::from_u32(iso + offset).unwrap_or(ch)
            }
            Some((iso, _)) => char::from_u32(iso).unwrap_or(ch),
            None => ch,
        };
        out.push((shaped, i));
        i += 1;
    }

    Ok(out)
}

/// Mirror a bracket for display inside a right-to-left run.
pub fn mirror(ch: char) -> char {
    match ch {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        '«' => '»',
        '»' => '«',
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shaped(text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        reshape(&chars).unwrap().into_iter().map(|(c, _)| c).collect()
    }

    #[test]
    fn forms_table_is_sorted() {
        assert!(FORMS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn isolated_letter() {
        assert_eq!(shaped("ب"), "\u{FE8F}");
    }

    #[test]
    fn dual_joining_word() {
        // beh-teh-beh: initial, medial, final
        assert_eq!(shaped("بتب"), "\u{FE91}\u{FE98}\u{FE90}");
    }

    #[test]
    fn right_joining_breaks_the_chain() {
        // beh + alef + beh: beh initial, alef final, beh isolated
        assert_eq!(shaped("باب"), "\u{FE91}\u{FE8E}\u{FE8F}");
    }

    #[test]
    fn lam_alef_ligature() {
        let chars: Vec<char> = "لا".chars().collect();
        let out = reshape(&chars).unwrap();
        assert_eq!(out, vec![('\u{FEFB}', 0)]);
    }

    #[test]
    fn lam_alef_final_after_joining_letter() {
        // beh + lam + alef
        assert_eq!(shaped("بلا"), "\u{FE91}\u{FEFC}");
    }

    #[test]
    fn marks_are_transparent() {
        // beh + fatha + teh: beh still initial, fatha untouched
        assert_eq!(shaped("بَت"), "\u{FE91}\u{064E}\u{FE96}");
    }

    #[test]
    fn tatweel_causes_joining() {
        assert_eq!(shaped("بـ"), "\u{FE91}\u{0640}");
    }

    #[test]
    fn non_arabic_passes_through() {
        assert_eq!(shaped("ab 12"), "ab 12");
    }

    #[test]
    fn orphan_mark_is_shaping_failure() {
        let chars: Vec<char> = "\u{064E}ب".chars().collect();
        assert!(matches!(
            reshape(&chars),
            Err(InvoiceError::ShapingFailure { .. })
        ));
    }

    #[test]
    fn control_character_is_shaping_failure() {
        let chars: Vec<char> = "ب\u{0007}ت".chars().collect();
        assert!(reshape(&chars).is_err());
    }

    #[test]
    fn output_keeps_source_indices() {
        let chars: Vec<char> = "سلام".chars().collect();
        let out = reshape(&chars).unwrap();
        let indices: Vec<usize> = out.iter().map(|(_, i)| *i).collect();
        assert_eq!(indices, vec![0, 1, 3]);
    }

    #[test]
    fn brackets_mirror() {
        assert_eq!(mirror('('), ')');
        assert_eq!(mirror('%'), '%');
    }
}
