//! Decoded form of the rule table.
//!
//! On disk every rule row is a vocab word, five packed condition words and
//! two packed action words. The packed integers are an on-disk detail only;
//! the interpreter works on the tagged variants below.

use log::warn;

/// One predicate slot of a rule row. The packed form is `param * 20 + op`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Op 0 carries no predicate; its argument feeds the row's parameter
    /// queue instead.
    Parameter(u16),
    ItemCarried(u16),
    ItemHere(u16),
    ItemPresent(u16),
    PlayerIn(u16),
    ItemNotHere(u16),
    ItemNotCarried(u16),
    PlayerNotIn(u16),
    BitSet(u16),
    BitClear(u16),
    SomethingCarried,
    NothingCarried,
    ItemNotPresent(u16),
    ItemInGame(u16),
    ItemDestroyed(u16),
    CounterLe(u16),
    CounterGt(u16),
    ItemNotMoved(u16),
    ItemMoved(u16),
    CounterEq(u16),
}

impl Condition {
    pub fn decode(code: u16) -> Condition {
        let param = code / 20;
        match code % 20 {
            0 => Condition::Parameter(param),
            1 => Condition::ItemCarried(param),
            2 => Condition::ItemHere(param),
            3 => Condition::ItemPresent(param),
            4 => Condition::PlayerIn(param),
            5 => Condition::ItemNotHere(param),
            6 => Condition::ItemNotCarried(param),
            7 => Condition::PlayerNotIn(param),
            8 => Condition::BitSet(param),
            9 => Condition::BitClear(param),
            10 => Condition::SomethingCarried,
            11 => Condition::NothingCarried,
            12 => Condition::ItemNotPresent(param),
            13 => Condition::ItemInGame(param),
            14 => Condition::ItemDestroyed(param),
            15 => Condition::CounterLe(param),
            16 => Condition::CounterGt(param),
            17 => Condition::ItemNotMoved(param),
            18 => Condition::ItemMoved(param),
            19 => Condition::CounterEq(param),
            _ => unreachable!(),
        }
    }
}

/// One opcode slot of a rule row. Two opcodes pack into each 16-bit action
/// word as `first * 150 + second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOp {
    Nop,
    /// Codes 1-51 print that message; codes 102-149 print message code-50.
    PrintMessage(u16),
    GetItem,
    DropItem,
    MovePlayer,
    RemoveItem,
    SetDark,
    ClearDark,
    SetBit,
    ClearBit,
    Death,
    PutItem,
    FinishGame,
    Score,
    Inventory,
    SetBit0,
    ClearBit0,
    RefillLight,
    ClearScreen,
    SaveGame,
    SwapItems,
    Continue,
    TakeItem,
    MoveItemToItem,
    DecrementCounter,
    PrintCounter,
    SetCounter,
    SwapRoom,
    SelectCounter,
    AddToCounter,
    SubFromCounter,
    EchoNoun,
    EchoNounNewline,
    Newline,
    SwapRoomRegister,
    Pause,
    DrawPicture,
    /// Anything outside the documented range; executed as a nop with a
    /// diagnostic so unofficial databases keep running.
    Unknown(u16),
}

impl ActionOp {
    pub fn decode(code: u16) -> ActionOp {
        match code {
            0 => ActionOp::Nop,
            1..=51 => ActionOp::PrintMessage(code),
            52 => ActionOp::GetItem,
            53 => ActionOp::DropItem,
            54 => ActionOp::MovePlayer,
            55 | 59 => ActionOp::RemoveItem,
            56 => ActionOp::SetDark,
            57 => ActionOp::ClearDark,
            58 => ActionOp::SetBit,
            60 => ActionOp::ClearBit,
            61 => ActionOp::Death,
            62 => ActionOp::PutItem,
            63 => ActionOp::FinishGame,
            // 64 and 76 are historical no-ops.
            64 | 76 => ActionOp::Nop,
            65 => ActionOp::Score,
            66 => ActionOp::Inventory,
            67 => ActionOp::SetBit0,
            68 => ActionOp::ClearBit0,
            69 => ActionOp::RefillLight,
            70 => ActionOp::ClearScreen,
            71 => ActionOp::SaveGame,
            72 => ActionOp::SwapItems,
            73 => ActionOp::Continue,
            74 => ActionOp::TakeItem,
            75 => ActionOp::MoveItemToItem,
            77 => ActionOp::DecrementCounter,
            78 => ActionOp::PrintCounter,
            79 => ActionOp::SetCounter,
            80 => ActionOp::SwapRoom,
            81 => ActionOp::SelectCounter,
            82 => ActionOp::AddToCounter,
            83 => ActionOp::SubFromCounter,
            84 => ActionOp::EchoNoun,
            85 => ActionOp::EchoNounNewline,
            86 => ActionOp::Newline,
            87 => ActionOp::SwapRoomRegister,
            88 => ActionOp::Pause,
            89 => ActionOp::DrawPicture,
            102..=149 => ActionOp::PrintMessage(code - 50),
            other => ActionOp::Unknown(other),
        }
    }
}

/// One row of the rule table, fully decoded.
#[derive(Debug, Clone)]
pub struct ActionRow {
    pub verb: u16,
    pub noun: u16,
    pub conditions: [Condition; 5],
    pub actions: [ActionOp; 4],
}

impl ActionRow {
    /// Build a row from the packed on-disk words.
    pub fn from_words(vocab: u16, conditions: [u16; 5], actions: [u16; 2]) -> ActionRow {
        let verb = vocab / 150;
        let noun = vocab % 150;
        if verb > 436 {
            warn!("implausible vocab word {vocab} in rule row");
        }
        ActionRow {
            verb,
            noun,
            conditions: conditions.map(Condition::decode),
            actions: [
                ActionOp::decode(actions[0] / 150),
                ActionOp::decode(actions[0] % 150),
                ActionOp::decode(actions[1] / 150),
                ActionOp::decode(actions[1] % 150),
            ],
        }
    }

    /// True when the row's vocab word is zero (ambient or continuation).
    pub fn is_ambient(&self) -> bool {
        self.verb == 0 && self.noun == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_codes_split_into_param_and_op() {
        assert_eq!(Condition::decode(0), Condition::Parameter(0));
        assert_eq!(Condition::decode(140), Condition::Parameter(7));
        assert_eq!(Condition::decode(9 * 20 + 1), Condition::ItemCarried(9));
        assert_eq!(Condition::decode(3 * 20 + 4), Condition::PlayerIn(3));
        assert_eq!(Condition::decode(5 * 20 + 15), Condition::CounterLe(5));
        assert_eq!(Condition::decode(5 * 20 + 16), Condition::CounterGt(5));
        assert_eq!(Condition::decode(2 * 20 + 19), Condition::CounterEq(2));
    }

    #[test]
    fn message_opcodes_cover_both_ranges() {
        assert_eq!(ActionOp::decode(1), ActionOp::PrintMessage(1));
        assert_eq!(ActionOp::decode(51), ActionOp::PrintMessage(51));
        assert_eq!(ActionOp::decode(102), ActionOp::PrintMessage(52));
        assert_eq!(ActionOp::decode(149), ActionOp::PrintMessage(99));
    }

    #[test]
    fn duplicate_and_historic_codes_collapse() {
        assert_eq!(ActionOp::decode(55), ActionOp::RemoveItem);
        assert_eq!(ActionOp::decode(59), ActionOp::RemoveItem);
        assert_eq!(ActionOp::decode(64), ActionOp::Nop);
        assert_eq!(ActionOp::decode(76), ActionOp::Nop);
        assert_eq!(ActionOp::decode(150), ActionOp::Unknown(150));
        assert_eq!(ActionOp::decode(101), ActionOp::Unknown(101));
    }

    #[test]
    fn rows_unpack_vocab_and_both_action_words() {
        let row = ActionRow::from_words(
            10 * 150 + 7,
            [140, 0, 0, 0, 0],
            [52 * 150 + 86, 73 * 150],
        );
        assert_eq!(row.verb, 10);
        assert_eq!(row.noun, 7);
        assert_eq!(row.conditions[0], Condition::Parameter(7));
        assert_eq!(row.actions[0], ActionOp::GetItem);
        assert_eq!(row.actions[1], ActionOp::Newline);
        assert_eq!(row.actions[2], ActionOp::Continue);
        assert_eq!(row.actions[3], ActionOp::Nop);
        assert!(!row.is_ambient());
        assert!(ActionRow::from_words(0, [0; 5], [0; 2]).is_ambient());
    }
}
