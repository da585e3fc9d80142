//! Operator command grammar.
//!
//! One command per line. Input is trimmed and lowercased before matching;
//! anything that does not match is not a command.

use once_cell::sync::Lazy;
use regex::Regex;

static DELETE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^d\s+(\d+)$").expect("static delete pattern"));

static MOVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^m\s+(\d+)\s+(\d+)\s*,\s*(\d+)$").expect("static move pattern")
});

/// A parsed operator command. Positions are 1-based and unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Delete(usize),
    Move { field: usize, from: usize, to: usize },
    Undo,
    Save,
    Quit,
    Help,
}

/// Command reference shown by `h`.
pub const HELP: &[(&str, &str)] = &[
    ("n, <Enter>", "Save edits for this group and go to the next"),
    ("p", "Go back to the previous group"),
    ("d <rec>", "Delete record number <rec> from the dataset"),
    ("m <field> <from>,<to>", "Copy field <field> from record <from> into record <to>"),
    ("u", "Undo the last delete or move in this group"),
    ("s", "Write the dataset to disk"),
    ("q", "Quit without saving"),
    ("h", "Show this help"),
];

impl Command {
    /// Parse one line of operator input.
    pub fn parse(line: &str) -> Option<Command> {
        let input = line.trim().to_lowercase();
        match input.as_str() {
            "" | "n" => return Some(Command::Next),
            "p" => return Some(Command::Previous),
            "u" => return Some(Command::Undo),
            "s" => return Some(Command::Save),
            "q" => return Some(Command::Quit),
            "h" => return Some(Command::Help),
            _ => {}
        }

        if let Some(caps) = DELETE_RE.captures(&input) {
            return Some(Command::Delete(position(&caps[1])));
        }
        if let Some(caps) = MOVE_RE.captures(&input) {
            return Some(Command::Move {
                field: position(&caps[1]),
                from: position(&caps[2]),
                to: position(&caps[3]),
            });
        }
        None
    }
}

// Digits that overflow still name a position; it is just never in range.
fn position(digits: &str) -> usize {
    digits.parse().unwrap_or(usize::MAX)
}
