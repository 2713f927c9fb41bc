//! # BiDi Text Support
//!
//! Implements UAX#9 (Unicode Bidirectional Algorithm) for Arabic text with
//! embedded Latin and numeric tokens. Uses `unicode-bidi` for level
//! resolution and `unicode-script` for script detection.
//!
//! The pipeline:
//! 1. Resolve per-character levels at an RTL paragraph level
//! 2. Pin numeric/Latin islands to a single even level
//! 3. Split into runs of equal level and compatible script
//! 4. Reorder runs visually with rule L2

use unicode_bidi::{BidiInfo, Level};
use unicode_script::{Script, UnicodeScript};

/// Script class of a run, as far as shaping is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunScript {
    /// Arabic letters; receives contextual forms.
    Arabic,
    /// Latin letters, possibly mixed with digits.
    Latin,
    /// Digits and numeric separators only.
    Numeric,
    /// Spaces and punctuation with no strong script.
    Neutral,
}

/// A contiguous run of text with a single BiDi level and script.
#[derive(Debug, Clone)]
pub struct BidiRun {
    /// Start index in chars of the original text.
    pub char_start: usize,
    /// End index (exclusive) in chars.
    pub char_end: usize,
    /// BiDi embedding level (even = LTR, odd = RTL).
    pub level: Level,
    /// Convenience: true if this run is right-to-left.
    pub is_rtl: bool,
    pub script: RunScript,
}

fn is_arabic_indic_digit(ch: char) -> bool {
    matches!(ch, '\u{0660}'..='\u{0669}' | '\u{06F0}'..='\u{06F9}')
}

fn is_island_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || is_arabic_indic_digit(ch)
}

fn is_island_separator(ch: char) -> bool {
    matches!(ch, '.' | '/' | ':' | ',' | '-')
}

fn classify(ch: char) -> RunScript {
    if ch.is_ascii_digit() || is_arabic_indic_digit(ch) {
        return RunScript::Numeric;
    }
    match ch.script() {
        Script::Arabic => RunScript::Arabic,
        Script::Latin => RunScript::Latin,
        _ => RunScript::Neutral,
    }
}

/// Resolve per-character embedding levels for text in an RTL paragraph.
///
/// Levels are taken after rule L1, so trailing whitespace sits at the
/// paragraph level.
pub fn resolve_levels(text: &str) -> Vec<Level> {
    if text.is_empty() {
        return vec![];
    }
    let bidi_info = BidiInfo::new(text, Some(Level::rtl()));
    let mut levels = Vec::with_capacity(text.chars().count());
    for para in &bidi_info.paragraphs {
        levels.extend(bidi_info.reordered_levels_per_char(para, para.range.clone()));
    }
    levels
}

/// Find numeric/Latin islands: `[A-Za-z0-9]+([./:,-][A-Za-z0-9]+)*%?`,
/// Arabic-Indic digits included. Returns char ranges.
pub fn find_islands(chars: &[char]) -> Vec<(usize, usize)> {
    let mut islands = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if !is_island_char(chars[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() {
            if is_island_char(chars[i]) {
                i += 1;
            } else if is_island_separator(chars[i])
                && chars.get(i + 1).is_some_and(|c| is_island_char(*c))
            {
                i += 1;
            } else {
                break;
            }
        }
        if chars.get(i) == Some(&'%') {
            i += 1;
        }
        islands.push((start, i));
    }
    islands
}

/// Force every island onto one even level so it is never reversed.
///
/// The island takes the smallest even level not below any of its
/// characters' levels, which keeps it nested inside its surroundings.
pub fn isolate_islands(chars: &[char], levels: &mut [Level]) {
    for (start, end) in find_islands(chars) {
        let Some(max) = levels[start..end].iter().copied().max() else {
            continue;
        };
        let target = if max.is_rtl() {
            Level::new(max.number() + 1).unwrap_or(max)
        } else {
            max
        };
        for level in &mut levels[start..end] {
            *level = target;
        }
    }
}

/// Analyze text for BiDi runs at an RTL paragraph level.
///
/// Runs break on every level change and wherever a strong script differs
/// from the run's script. Latin letters and digits share a run; neutrals
/// join whatever run they sit in.
pub fn analyze_bidi(text: &str) -> (Vec<char>, Vec<BidiRun>) {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return (chars, vec![]);
    }

    let mut levels = resolve_levels(text);
    levels.resize(chars.len(), Level::rtl());
    isolate_islands(&chars, &mut levels);

    let mut runs = Vec::new();
    let mut run_start = 0;
    let mut run_script = RunScript::Neutral;

    for i in 0..chars.len() {
        let class = classify(chars[i]);
        let compatible = match (run_script, class) {
            (_, RunScript::Neutral) | (RunScript::Neutral, _) => true,
            (RunScript::Latin, RunScript::Numeric) | (RunScript::Numeric, RunScript::Latin) => true,
            (a, b) => a == b,
        };
        if i > run_start && (levels[i] != levels[run_start] || !compatible) {
            runs.push(make_run(run_start, i, levels[run_start], run_script));
            run_start = i;
            run_script = RunScript::Neutral;
        }
        run_script = merge_script(run_script, class);
    }
    runs.push(make_run(run_start, chars.len(), levels[run_start], run_script));

    (chars, runs)
}

fn merge_script(current: RunScript, next: RunScript) -> RunScript {
    match (current, next) {
        (RunScript::Neutral, s) => s,
        (s, RunScript::Neutral) => s,
        (RunScript::Numeric, RunScript::Latin) => RunScript::Latin,
        (s, _) => s,
    }
}

fn make_run(start: usize, end: usize, level: Level, script: RunScript) -> BidiRun {
    BidiRun {
        char_start: start,
        char_end: end,
        level,
        is_rtl: level.is_rtl(),
        script,
    }
}

/// Reorder items (runs or characters) from logical to visual order.
///
/// Applies rule L2: from the highest level down to the lowest odd level,
/// reverse every contiguous sequence at that level or higher.
pub fn reorder_visual<T>(mut items: Vec<T>, levels: &[Level]) -> Vec<T> {
    if items.is_empty() || levels.is_empty() {
        return items;
    }

    let min_level = levels.iter().copied().min().unwrap_or(Level::ltr());
    let max_level = levels.iter().copied().max().unwrap_or(Level::ltr());

    if max_level.number() == 0 {
        return items;
    }

    let min_odd = if min_level.is_rtl() {
        min_level
    } else {
        Level::rtl()
    };

    let level_at = |i: usize| levels.get(i).copied().unwrap_or(Level::ltr());

    let mut current_level = max_level;
    while current_level >= min_odd {
        let mut i = 0;
        while i < items.len() {
            if level_at(i) >= current_level {
                let start = i;
                while i < items.len() && level_at(i) >= current_level {
                    i += 1;
                }
                items[start..i].reverse();
            } else {
                i += 1;
            }
        }
        if current_level.number() == 0 {
            break;
        }
        current_level = Level::new(current_level.number() - 1).unwrap_or(Level::ltr());
    }

    items
}
