//! The immutable game model built by the loader.
//!
//! Nothing here changes after load; per-session mutable state lives in
//! [`crate::vm::WorldState`].

use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use crate::action::ActionRow;

/// Exit directions, in record order.
pub const EXIT_NAMES: [&str; 6] = ["North", "South", "East", "West", "Up", "Down"];

#[derive(Debug, Clone, Default)]
pub struct Room {
    /// Destination room per direction, 0 = no exit.
    pub exits: [u8; 6],
    /// Description. A leading `*` marks literal text; otherwise the
    /// interpreter prefixes "I'm in a " / "You are in a ".
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Item {
    pub text: String,
    pub initial_location: u8,
    /// Image number from the dump; carried but unused by this interpreter.
    pub image: u8,
    /// Flag byte from the dump; carried but unused by this interpreter.
    pub flag: u8,
    /// Uppercased noun for the system TAKE/DROP verbs, when the item
    /// description carries one.
    pub auto_word: Option<String>,
}

#[derive(Debug)]
pub struct GameData {
    pub num_items: usize,
    pub num_actions: usize,
    pub num_words: usize,
    pub num_rooms: usize,
    pub num_messages: usize,
    /// How many leading characters a dictionary match compares.
    pub word_length: usize,
    pub max_carry: usize,
    pub starting_room: u8,
    pub treasure_room: u8,
    pub total_treasures: u32,
    /// Turns of light at the start, -1 for unlimited.
    pub light_time_initial: i32,
    /// Dictionary tables; a leading `*` marks a synonym of the nearest
    /// preceding non-synonym entry.
    pub verbs: Vec<String>,
    pub nouns: Vec<String>,
    /// Rooms 0..num_rooms inclusive; the last room doubles as limbo.
    pub rooms: Vec<Room>,
    pub items: Vec<Item>,
    pub actions: Vec<ActionRow>,
    pub messages: Vec<String>,
}

impl GameData {
    /// Count of treasures currently parked in the treasure room.
    pub fn treasures_stored(&self, locations: &[u8]) -> u32 {
        self.items
            .iter()
            .zip(locations)
            .filter(|(item, &loc)| loc == self.treasure_room && item.text.starts_with('*'))
            .count() as u32
    }
}

impl Display for GameData {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "
Items:       {}
Actions:     {}
Word pairs:  {}
Rooms:       {}
Messages:    {}
Word length: {}
Carry limit: {}
Start room:  {}
Light turns: {}
",
            self.num_items,
            self.num_actions,
            self.num_words,
            self.num_rooms,
            self.num_messages,
            self.word_length,
            self.max_carry,
            self.starting_room,
            self.light_time_initial,
        )
    }
}
