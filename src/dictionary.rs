//! Dictionary lookup and command tokenization.
//!
//! Matches compare only the first `word_length` characters, ignoring case.
//! An entry beginning with `*` is a synonym: a hit on it resolves to the
//! nearest preceding non-synonym entry.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::game::GameData;
use crate::vm::WorldState;

/// Longest token the command reader keeps, as the classic drivers did.
pub const MAX_TOKEN: usize = 9;

lazy_static! {
    /// Single-letter shortcuts expanded before verb lookup.
    static ref SHORTCUTS: HashMap<char, &'static str> = {
        let mut m = HashMap::new();
        m.insert('n', "NORTH");
        m.insert('e', "EAST");
        m.insert('s', "SOUTH");
        m.insert('w', "WEST");
        m.insert('u', "UP");
        m.insert('d', "DOWN");
        m.insert('i', "INVENTORY");
        m
    };
}

/// Compare like strncasecmp: up to `n` characters, stopping early when both
/// strings end together.
fn prefix_eq(a: &str, b: &str, n: usize) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    for i in 0..n {
        let ca = a.get(i).map(u8::to_ascii_uppercase);
        let cb = b.get(i).map(u8::to_ascii_uppercase);
        if ca != cb {
            return false;
        }
        if ca.is_none() {
            return true;
        }
    }
    true
}

/// Find `word` in a dictionary table. Returns the resolved index (synonyms
/// map to their headword) or -1.
pub fn which_word(word: &str, list: &[String], word_length: usize) -> i32 {
    if word.is_empty() {
        return -1;
    }
    let mut headword = 1;
    for ne in 1..list.len() {
        let entry = match list[ne].strip_prefix('*') {
            Some(tail) => tail,
            None => {
                headword = ne;
                list[ne].as_str()
            }
        };
        if prefix_eq(word, entry, word_length) {
            return headword as i32;
        }
    }
    -1
}

/// Resolve `word` to the headword text of its noun synonym group, when it
/// names one at all.
pub fn map_synonym<'a>(word: &str, game: &'a GameData) -> Option<&'a str> {
    let mut last: &str = "";
    for entry in game.nouns.iter().skip(1) {
        let tail = match entry.strip_prefix('*') {
            Some(tail) => tail,
            None => {
                last = entry.as_str();
                entry.as_str()
            }
        };
        if prefix_eq(word, tail, game.word_length) {
            return Some(last);
        }
    }
    None
}

/// Find an item at `location` whose auto-word answers to the typed noun.
pub fn match_up_item(noun_text: &str, location: u8, game: &GameData, state: &WorldState) -> Option<usize> {
    let word = map_synonym(noun_text, game).unwrap_or(noun_text);
    game.items.iter().enumerate().position(|(i, item)| {
        state.item_location[i] == location
            && item
                .auto_word
                .as_deref()
                .is_some_and(|auto| prefix_eq(auto, word, game.word_length))
    })
}

/// Expand the single-letter movement and inventory shortcuts.
pub fn expand_single_letter(verb: &str) -> &str {
    let mut chars = verb.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => SHORTCUTS
            .get(&c.to_ascii_lowercase())
            .copied()
            .unwrap_or(verb),
        _ => verb,
    }
}

/// Split a command line into its first two tokens, truncated to
/// [`MAX_TOKEN`] characters. None when the line is blank.
pub fn split_command(line: &str) -> Option<(String, String)> {
    let mut tokens = line.split_whitespace();
    let verb = tokens.next()?;
    let noun = tokens.next().unwrap_or("");
    let clip = |t: &str| t.chars().take(MAX_TOKEN).collect::<String>();
    Some((clip(verb), clip(noun)))
}
