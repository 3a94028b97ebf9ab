//! Line-oriented text save format.
//!
//! ```text
//! <counter0> <room_saved0>      (16 lines)
//! <bitflags> <dark> <room> <counter> <saved_room> <light_time>
//! <item location>               (one line per item)
//! ```
//!
//! `dark` records bit 15 separately; on restore it is OR-ed back in, which
//! keeps files from drivers that predate dark living in the flag word
//! loading correctly.

use log::debug;
use std::io::{self, BufRead, Write};

use crate::vm::{WorldState, DARK_BIT};

pub fn save(state: &WorldState, out: &mut impl Write) -> io::Result<()> {
    for ct in 0..16 {
        writeln!(out, "{} {}", state.counters[ct], state.room_saved[ct])?;
    }
    writeln!(
        out,
        "{} {} {} {} {} {}",
        state.bitflags,
        state.bit_set(DARK_BIT) as u8,
        state.player_room,
        state.current_counter,
        state.saved_room,
        state.light_time
    )?;
    for &loc in &state.item_location {
        writeln!(out, "{loc}")?;
    }
    debug!("state saved: {} items", state.item_location.len());
    Ok(())
}

pub fn restore(state: &mut WorldState, input: &mut impl BufRead) -> Result<(), String> {
    let mut lines = input.lines();
    let mut next_line = || -> Result<String, String> {
        lines
            .next()
            .ok_or_else(|| "save file truncated".to_string())?
            .map_err(|e| format!("save file unreadable: {e}"))
    };

    let mut restored = state.clone();
    for ct in 0..16 {
        let line = next_line()?;
        let mut fields = line.split_whitespace();
        restored.counters[ct] = parse_field(fields.next(), "counter")?;
        restored.room_saved[ct] = parse_field(fields.next(), "room register")?;
    }

    let line = next_line()?;
    let mut fields = line.split_whitespace();
    restored.bitflags = parse_field(fields.next(), "bitflags")?;
    let dark_flag: u8 = parse_field(fields.next(), "dark flag")?;
    restored.player_room = parse_field(fields.next(), "player room")?;
    restored.current_counter = parse_field(fields.next(), "counter")?;
    restored.saved_room = parse_field(fields.next(), "saved room")?;
    restored.light_time = parse_field(fields.next(), "light time")?;
    if dark_flag != 0 {
        restored.set_bit(DARK_BIT);
    }

    for loc in restored.item_location.iter_mut() {
        *loc = next_line()?
            .trim()
            .parse()
            .map_err(|e| format!("bad item location in save file: {e}"))?;
    }

    debug!("state restored: {} items", restored.item_location.len());
    *state = restored;
    Ok(())
}

fn parse_field<T: std::str::FromStr>(field: Option<&str>, what: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    field
        .ok_or_else(|| format!("missing {what} in save file"))?
        .parse()
        .map_err(|e| format!("bad {what} in save file: {e}"))
}
