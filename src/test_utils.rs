//! Fixture builders for interpreter and state tests.

use crate::action::ActionRow;
use crate::chance::Chance;
use crate::display_headless::HeadlessDisplay;
use crate::display_trait::GameDisplay;
use crate::game::{GameData, Item, Room};
use crate::interpreter::Interpreter;
use crate::options::Options;

/// Pack a condition as it sits in the database: `arg * 20 + op`.
pub fn cond(op: u16, arg: u16) -> u16 {
    arg * 20 + op
}

/// Pack two opcodes into one action word.
pub fn ops(first: u16, second: u16) -> u16 {
    first * 150 + second
}

pub struct GameBuilder {
    rooms: Vec<Room>,
    items: Vec<Item>,
    verbs: Vec<String>,
    nouns: Vec<String>,
    messages: Vec<String>,
    actions: Vec<ActionRow>,
    max_carry: usize,
    starting_room: u8,
    treasure_room: u8,
    total_treasures: u32,
    light_time: i32,
}

impl GameBuilder {
    pub fn new() -> Self {
        GameBuilder {
            rooms: vec![Room::default()], // room 0 is the void
            items: Vec::new(),
            verbs: Vec::new(),
            nouns: Vec::new(),
            messages: vec![String::new()], // message 0 is unused
            actions: Vec::new(),
            max_carry: 6,
            starting_room: 1,
            treasure_room: 0,
            total_treasures: 0,
            light_time: -1,
        }
    }

    pub fn room(mut self, text: &str, exits: [u8; 6]) -> Self {
        self.rooms.push(Room {
            text: text.to_string(),
            exits,
        });
        self
    }

    pub fn item(mut self, text: &str, auto_word: Option<&str>, location: u8) -> Self {
        self.items.push(Item {
            text: text.to_string(),
            initial_location: location,
            auto_word: auto_word.map(str::to_string),
            ..Item::default()
        });
        self
    }

    pub fn verb(mut self, index: usize, word: &str) -> Self {
        set_entry(&mut self.verbs, index, word);
        self
    }

    pub fn noun(mut self, index: usize, word: &str) -> Self {
        set_entry(&mut self.nouns, index, word);
        self
    }

    pub fn message(mut self, text: &str) -> Self {
        self.messages.push(text.to_string());
        self
    }

    /// Add a rule row from packed words, the way the loader sees them.
    pub fn action(mut self, verb: u16, noun: u16, conditions: &[u16], actions: &[u16]) -> Self {
        let mut c = [0u16; 5];
        c[..conditions.len()].copy_from_slice(conditions);
        let mut a = [0u16; 2];
        a[..actions.len()].copy_from_slice(actions);
        self.actions.push(ActionRow::from_words(verb * 150 + noun, c, a));
        self
    }

    pub fn max_carry(mut self, n: usize) -> Self {
        self.max_carry = n;
        self
    }

    pub fn treasures(mut self, total: u32, room: u8) -> Self {
        self.total_treasures = total;
        self.treasure_room = room;
        self
    }

    pub fn light_time(mut self, turns: i32) -> Self {
        self.light_time = turns;
        self
    }

    pub fn build(mut self) -> GameData {
        self.rooms.push(Room::default()); // the last room doubles as limbo
        if self.items.is_empty() {
            self.items.push(Item::default());
        }
        if self.actions.is_empty() {
            self.actions.push(ActionRow::from_words(0, [0; 5], [0; 2]));
        }
        let num_words = self.verbs.len().max(self.nouns.len()).max(19) - 1;
        set_entry(&mut self.verbs, num_words, "");
        set_entry(&mut self.nouns, num_words, "");
        GameData {
            num_items: self.items.len() - 1,
            num_actions: self.actions.len() - 1,
            num_words,
            num_rooms: self.rooms.len() - 1,
            num_messages: self.messages.len() - 1,
            word_length: 4,
            max_carry: self.max_carry,
            starting_room: self.starting_room,
            treasure_room: self.treasure_room,
            total_treasures: self.total_treasures,
            light_time_initial: self.light_time,
            verbs: self.verbs,
            nouns: self.nouns,
            rooms: self.rooms,
            items: self.items,
            actions: self.actions,
            messages: self.messages,
        }
    }
}

fn set_entry(list: &mut Vec<String>, index: usize, word: &str) {
    if list.len() <= index {
        list.resize(index + 1, String::new());
    }
    list[index] = word.to_string();
}

/// A small but complete game: two rooms, a takeable sword and lamp, the
/// basic movement nouns, GET/DROP verbs.
pub fn standard_game() -> GameData {
    GameBuilder::new()
        .room("quiet clearing", [2, 0, 0, 0, 0, 0])
        .room("damp cave", [0, 1, 0, 0, 0, 0])
        .verb(1, "Go")
        .verb(10, "Get")
        .verb(11, "*Take")
        .verb(18, "Drop")
        .noun(1, "Nort")
        .noun(2, "Sout")
        .noun(3, "East")
        .noun(4, "West")
        .noun(5, "Up")
        .noun(6, "Down")
        .noun(7, "Swor")
        .noun(8, "Lamp")
        .item("Sharp sword", Some("SWORD"), 1)
        .item("*Golden crown*", Some("CROWN"), 2)
        .item("Empty flask", None, 2)
        .item("Rusty key", Some("KEY"), 0)
        .item("Worn bench", None, 1)
        .item("", None, 0)
        .item("", None, 0)
        .item("", None, 0)
        .item("", None, 0)
        .item("Old oil lamp", Some("LAMP"), 1) // slot 9, the light source
        .build()
}

/// Interpreter over the standard game with scripted input; returns the
/// interpreter and the transcript handle.
pub fn scripted_interpreter(
    game: GameData,
    script: &[&str],
) -> (
    Interpreter,
    std::rc::Rc<std::cell::RefCell<crate::display_headless::Transcript>>,
) {
    let display = HeadlessDisplay::with_script(script);
    let transcript = display.transcript();
    let interp = Interpreter::new(
        game,
        Options::default(),
        Box::new(display) as Box<dyn GameDisplay>,
        Chance::new_predictable(7),
    );
    (interp, transcript)
}
