//! Heuristic database loader.
//!
//! The dumps this interpreter accepts are raw memory images: the relative
//! layout of the sections is stable but their absolute offsets drift. After
//! the header scan fixes a baseline delta, each section is located by
//! starting at its nominal offset plus the delta and sliding byte by byte
//! until a section-specific fingerprint passes. The fingerprints encode
//! properties of the known database family, not the format itself.

use log::{debug, info};
use std::fmt;
use std::io;

use crate::action::ActionRow;
use crate::game::{GameData, Item, Room};
use crate::header::Header;
use crate::text;

/// Fatal database problem: unreadable file, no header, section or string
/// decode running off the image.
#[derive(Debug, Clone)]
pub struct LoadError {
    pub message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LoadError {}

impl From<io::Error> for LoadError {
    fn from(error: io::Error) -> Self {
        Self::new(format!("I/O error: {error}"))
    }
}

// Nominal section offsets in a pristine dump, adjusted by the header delta.
const ITEM_FLAGS_OFFSET: i64 = 0x4961;
const ITEM_IMAGES_OFFSET: i64 = 0x46cc;
const ACTIONS_OFFSET: i64 = 0x4a5d;
const DICTIONARY_OFFSET: i64 = 0x591b;
const ROOM_EXITS_OFFSET: i64 = 23627;
const ITEM_LOCATIONS_OFFSET: i64 = 0x5e3d;
const MESSAGES_OFFSET: i64 = 0x9ea0;
const ROOM_TEXTS_OFFSET: i64 = 42928;
const ITEM_TEXTS_OFFSET: i64 = 44229;

/// Fixed dictionary shape: 69 verb records then 135 noun records.
const DICT_VERBS: usize = 69;
const DICT_NOUNS: usize = 135;
const DICT_RECORD: usize = 4;

/// Build the full game model from a raw image.
pub fn load_database(image: &[u8], file_name: &str) -> Result<GameData, LoadError> {
    let (header, delta) = Header::scan(image, file_name)?;
    info!("database header located, delta {delta}");
    debug!("{header}");

    let ni = header.num_items();
    let na = header.num_actions();
    let nw = header.num_words();
    let nr = header.num_rooms();
    if !(1..=8).contains(&header.word_length()) {
        return Err(LoadError::new(format!(
            "implausible word length {} in {file_name}",
            header.word_length()
        )));
    }
    if !(0..=1000).contains(&header.num_messages()) {
        return Err(LoadError::new(format!(
            "implausible message count {} in {file_name}",
            header.num_messages()
        )));
    }
    let wl = header.word_length() as usize;
    let mn = header.num_messages() as usize;

    let flags = scan_byte_table(image, section_start(ITEM_FLAGS_OFFSET, delta)?, ni + 1, "item flags", |i, b| {
        i != 17 || b & 0x7f == 1
    })?;

    let images = scan_byte_table(image, section_start(ITEM_IMAGES_OFFSET, delta)?, ni + 1, "item images", |i, b| {
        let pinned = i != 17 || b == 138;
        pinned && (b <= 138 || b == 255)
    })?;

    let actions = scan_actions(image, section_start(ACTIONS_OFFSET, delta)?, na, nw)?;

    let (verbs, nouns) = read_dictionary(image, section_start(DICTIONARY_OFFSET, delta)?, nw)?;

    let exits = scan_byte_table(image, section_start(ROOM_EXITS_OFFSET, delta)?, nr * 6, "room exits", |i, b| {
        let (room, exit) = (i / 6, i % 6);
        b as usize <= nr
            && !(room == 11 && exit == 4 && b != 1)
            && !(room == 1 && exit == 5 && b != 11)
    })?;

    let locations = scan_byte_table(
        image,
        section_start(ITEM_LOCATIONS_OFFSET, delta)?,
        ni + 1,
        "item locations",
        |i, b| (i != 41 && i != 123) || b == 11,
    )?;

    debug!("reading {} messages", mn + 1);
    let messages_base = section_start(MESSAGES_OFFSET, delta)?;
    let mut messages = Vec::with_capacity(mn + 1);
    for ct in 0..=mn {
        messages.push(text::decode(image, messages_base, ct)?);
    }

    debug!("reading {nr} room descriptions");
    let rooms_base = section_start(ROOM_TEXTS_OFFSET, delta)?;
    let mut rooms: Vec<Room> = vec![Room::default(); nr + 1];
    for ct in 0..nr {
        rooms[ct].exits = <[u8; 6]>::try_from(&exits[ct * 6..ct * 6 + 6])
            .map_err(|_| LoadError::new("room exit table too short"))?;
        let mut t = text::decode(image, rooms_base, ct)?;
        if let Some(first) = t.get_mut(0..1) {
            first.make_ascii_lowercase();
        }
        rooms[ct].text = t;
    }

    debug!("reading {} item descriptions", ni + 1);
    let items_base = section_start(ITEM_TEXTS_OFFSET, delta)?;
    let mut items = Vec::with_capacity(ni + 1);
    for ct in 0..=ni {
        let full = text::decode(image, items_base, ct)?;
        let (text, auto_word) = split_auto_word(&full);
        items.push(Item {
            text,
            initial_location: locations[ct],
            image: images[ct],
            flag: flags[ct],
            auto_word,
        });
    }

    info!("load complete: {} items, {} actions, {} rooms", ni + 1, na + 1, nr);

    Ok(GameData {
        num_items: ni,
        num_actions: na,
        num_words: nw,
        num_rooms: nr,
        num_messages: mn,
        word_length: wl,
        max_carry: header.max_carry(),
        // This dump family does not carry these in the header.
        starting_room: 1,
        treasure_room: 0,
        total_treasures: 0,
        light_time_initial: -1,
        verbs,
        nouns,
        rooms,
        items,
        actions,
        messages,
    })
}

fn section_start(nominal: i64, delta: i64) -> Result<usize, LoadError> {
    usize::try_from(nominal + delta)
        .map_err(|_| LoadError::new(format!("section offset {nominal:#x}{delta:+} underflows the image")))
}

/// Slide a fixed-width byte table forward until every byte satisfies the
/// fingerprint.
fn scan_byte_table(
    image: &[u8],
    start: usize,
    count: usize,
    name: &str,
    ok: impl Fn(usize, u8) -> bool,
) -> Result<Vec<u8>, LoadError> {
    let mut offset = start;
    'retry: loop {
        let window = image
            .get(offset..offset + count)
            .ok_or_else(|| LoadError::new(format!("{name} section runs off the image")))?;
        for (i, &b) in window.iter().enumerate() {
            if !ok(i, b) {
                offset += 1;
                continue 'retry;
            }
        }
        if offset != start {
            debug!("{name} section found at {offset:#x} ({:+} from nominal)", offset as i64 - start as i64);
        }
        return Ok(window.to_vec());
    }
}

/// The action table slides backwards on a fingerprint failure. Records are
/// variable length on disk: unused condition and action slots are simply
/// not stored.
fn scan_actions(image: &[u8], start: usize, na: usize, nw: usize) -> Result<Vec<ActionRow>, LoadError> {
    let mut offset = start;
    'retry: loop {
        let mut pos = offset;
        let mut rows = Vec::with_capacity(na + 1);
        for _ in 0..=na {
            let vocab = read_word(image, &mut pos, "actions")?;
            if (vocab / 150) as usize > nw || (vocab % 150) as usize > nw {
                offset = offset
                    .checked_sub(1)
                    .ok_or_else(|| LoadError::new("action table fingerprint never matched"))?;
                continue 'retry;
            }
            let counts = read_byte(image, &mut pos, "actions")?;
            let cond = (counts & 0x1f) as usize;
            let comm = ((counts & 0xe0) >> 5) as usize;
            let mut conditions = [0u16; 5];
            for (j, slot) in conditions.iter_mut().enumerate() {
                if j < cond {
                    *slot = read_word(image, &mut pos, "actions")?;
                }
            }
            let mut actions = [0u16; 2];
            for (j, slot) in actions.iter_mut().enumerate() {
                if j < comm {
                    *slot = read_word(image, &mut pos, "actions")?;
                }
            }
            rows.push(ActionRow::from_words(vocab, conditions, actions));
        }
        if offset != start {
            debug!("action table found at {offset:#x} ({:+} from nominal)", offset as i64 - start as i64);
        }
        return Ok(rows);
    }
}

/// Dictionary records are 4 bytes, verbs first. A lowercase first byte
/// marks a new headword (stored uppercased); anything else is a synonym of
/// the preceding headword and gains the `*` prefix the lookup layer
/// expects. Both tables are padded with empty entries out to the header's
/// word count.
fn read_dictionary(image: &[u8], start: usize, nw: usize) -> Result<(Vec<String>, Vec<String>), LoadError> {
    let mut verbs = Vec::with_capacity(DICT_VERBS.max(nw + 1));
    let mut nouns = Vec::with_capacity(DICT_NOUNS.max(nw + 1));
    for record in 0..DICT_VERBS + DICT_NOUNS {
        let pos = start + record * DICT_RECORD;
        let bytes = image
            .get(pos..pos + DICT_RECORD)
            .ok_or_else(|| LoadError::new("dictionary section runs off the image"))?;
        let mut word = String::with_capacity(DICT_RECORD + 1);
        for (i, &b) in bytes.iter().enumerate() {
            let c = b as char;
            if i == 0 {
                if c.is_ascii_lowercase() {
                    word.push(c.to_ascii_uppercase());
                    continue;
                }
                word.push('*');
            }
            // Records are NUL padded out to their fixed width.
            if b == 0 {
                break;
            }
            word.push(c);
        }
        if record < DICT_VERBS {
            verbs.push(word);
        } else {
            nouns.push(word);
        }
    }
    while verbs.len() < nw + 1 {
        verbs.push(String::new());
    }
    while nouns.len() < nw + 1 {
        nouns.push(String::new());
    }
    debug!("dictionary read: {} verbs, {} nouns", verbs.len(), nouns.len());
    Ok((verbs, nouns))
}

/// Item descriptions embed the TAKE/DROP noun after the first period:
/// "Magic mirror. MIRROR. " displays as "Magic mirror" and automatically
/// answers to MIRROR.
fn split_auto_word(full: &str) -> (String, Option<String>) {
    match full.find('.') {
        Some(dot) => {
            // The codec always emits a space after the period.
            let rest = full.get(dot + 2..).unwrap_or("");
            let word = match rest.find('.') {
                Some(end) => &rest[..end],
                None => rest,
            };
            (full[..dot].to_string(), Some(word.to_ascii_uppercase()))
        }
        None => (full.to_string(), None),
    }
}

fn read_byte(image: &[u8], pos: &mut usize, name: &str) -> Result<u8, LoadError> {
    let b = image
        .get(*pos)
        .copied()
        .ok_or_else(|| LoadError::new(format!("{name} section runs off the image")))?;
    *pos += 1;
    Ok(b)
}

fn read_word(image: &[u8], pos: &mut usize, name: &str) -> Result<u16, LoadError> {
    let lo = read_byte(image, pos, name)? as u16;
    let hi = read_byte(image, pos, name)? as u16;
    Ok(hi << 8 | lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_table_slides_past_garbage() {
        let mut image = vec![0u8; 64];
        // Fingerprint: byte 3 of the table must be 7.
        image[10] = 9;
        image[23] = 7;
        let table = scan_byte_table(&image, 8, 6, "test", |i, b| i != 3 || b == 7).unwrap();
        assert_eq!(table[3], 7);
        assert_eq!(table, vec![0, 0, 0, 7, 0, 0]);
    }

    #[test]
    fn byte_table_scan_stops_at_image_end() {
        let image = vec![0u8; 32];
        let err = scan_byte_table(&image, 0, 8, "flagged", |i, b| i != 0 || b == 1).unwrap_err();
        assert!(err.to_string().contains("flagged"));
    }

    #[test]
    fn dictionary_casing_marks_synonyms() {
        let mut image = Vec::new();
        for w in ["auto", "go\0\0", "ENTE", "run\0"] {
            image.extend(w.as_bytes());
        }
        image.resize((DICT_VERBS + DICT_NOUNS) * DICT_RECORD, 0);
        let (verbs, nouns) = read_dictionary(&image, 0, 140).unwrap();
        assert_eq!(verbs[0], "Auto");
        assert_eq!(verbs[1], "Go");
        assert_eq!(verbs[2], "*ENTE");
        assert_eq!(verbs[3], "Run");
        assert_eq!(verbs.len(), 141);
        assert_eq!(nouns.len(), 141);
        assert_eq!(nouns[0], "*");
    }

    #[test]
    fn auto_words_split_on_the_first_period() {
        let (text, auto) = split_auto_word("Magic mirror. Mirror. ");
        assert_eq!(text, "Magic mirror");
        assert_eq!(auto.as_deref(), Some("MIRROR"));

        let (text, auto) = split_auto_word("Old rusty axe");
        assert_eq!(text, "Old rusty axe");
        assert_eq!(auto, None);

        let (text, auto) = split_auto_word("Sign. ");
        assert_eq!(text, "Sign");
        assert_eq!(auto.as_deref(), Some(""));
    }

    #[test]
    fn action_records_are_variable_length() {
        // Two records: one bare, one with one condition and one action word.
        let mut image = Vec::new();
        image.extend((10u16 * 150 + 3).to_le_bytes());
        image.push(1 | 1 << 5);
        image.extend(140u16.to_le_bytes()); // Parameter(7)
        image.extend((52u16 * 150).to_le_bytes());
        image.extend(0u16.to_le_bytes());
        image.push(0);
        let rows = scan_actions(&image, 0, 1, 20).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].verb, 10);
        assert_eq!(rows[0].noun, 3);
        assert!(rows[1].is_ambient());
    }
}
