//! Mutable per-session world state.

use log::warn;

use crate::game::GameData;

/// Item location sentinel: in the player's hands.
pub const CARRIED: u8 = 255;
/// Item location sentinel: removed from play (room zero by convention).
pub const DESTROYED: u8 = 0;

/// The light source lives at this item slot in every game of this family.
pub const LIGHT_SOURCE: usize = 9;

/// Flag bit: the world is dark.
pub const DARK_BIT: u16 = 15;
/// Flag bit: the light source has burned out.
pub const LIGHT_OUT_BIT: u16 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct WorldState {
    pub player_room: u8,
    pub item_location: Vec<u8>,
    pub bitflags: u64,
    pub current_counter: i32,
    pub counters: [i32; 16],
    pub saved_room: u8,
    pub room_saved: [u8; 16],
    /// Turns of light remaining; -1 burns forever.
    pub light_time: i32,
    /// Raw noun token from the last command, for the TAKE/DROP system verbs
    /// and the noun-echo opcodes.
    pub noun_text: String,
}

impl WorldState {
    pub fn new(game: &GameData) -> WorldState {
        WorldState {
            player_room: game.starting_room,
            item_location: game.items.iter().map(|i| i.initial_location).collect(),
            bitflags: 0,
            current_counter: 0,
            counters: [0; 16],
            saved_room: 0,
            room_saved: [0; 16],
            light_time: game.light_time_initial,
            noun_text: String::new(),
        }
    }

    pub fn count_carried(&self) -> usize {
        self.item_location.iter().filter(|&&l| l == CARRIED).count()
    }

    pub fn bit_set(&self, bit: u16) -> bool {
        bit < 64 && self.bitflags & 1 << bit != 0
    }

    pub fn set_bit(&mut self, bit: u16) {
        if bit < 64 {
            self.bitflags |= 1 << bit;
        } else {
            warn!("flag bit {bit} out of range, ignored");
        }
    }

    pub fn clear_bit(&mut self, bit: u16) {
        if bit < 64 {
            self.bitflags &= !(1 << bit);
        } else {
            warn!("flag bit {bit} out of range, ignored");
        }
    }

    /// Is the light source in the player's hands or in the room?
    pub fn light_present(&self) -> bool {
        matches!(
            self.item_location.get(LIGHT_SOURCE),
            Some(&loc) if loc == CARRIED || loc == self.player_room
        )
    }

    /// Cross-checks the state against the game model; meant for tests and
    /// debug assertions between turns.
    pub fn check_invariants(&self, game: &GameData) -> Result<(), String> {
        if self.player_room as usize > game.num_rooms {
            return Err(format!("player in nonexistent room {}", self.player_room));
        }
        for (i, &loc) in self.item_location.iter().enumerate() {
            if loc != CARRIED && loc as usize > game.num_rooms {
                return Err(format!("item {i} in nonexistent room {loc}"));
            }
        }
        if self.count_carried() > game.max_carry {
            return Err(format!(
                "carrying {} items with a limit of {}",
                self.count_carried(),
                game.max_carry
            ));
        }
        if self.current_counter < -1 {
            return Err(format!("counter fell to {}", self.current_counter));
        }
        Ok(())
    }
}
