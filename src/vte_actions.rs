use crate::vte_actions::VteAction::{
    Backspace, CarriageReturn, CursorNextLine, LineFeed, Tab, Text,
};
use unicode_width::UnicodeWidthChar;
use vte::{Params, Parser, Perform};

const TAB_WIDTH: usize = 8;

/// The semantic actions that matter when flattening terminal output into
/// plain lines. Everything else (colors, cursor addressing, OSC titles) is
/// dropped by the performer.
#[derive(Debug, PartialEq, Eq)]
pub enum VteAction {
    Text(char),
    Tab,
    LineFeed,
    CarriageReturn,
    Backspace,
    CursorNextLine(u16),
}

/// A wrapper over [Parser] and [Perform] which takes bytes in and exposes the
/// semantic actions. The parser is kept between calls so an escape sequence
/// (or UTF-8 character) split across two pty reads still parses.
pub struct VteActionParser {
    parser: Parser,
}

impl VteActionParser {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    pub fn parse_bytes(&mut self, bytes: &[u8]) -> Vec<VteAction> {
        let mut performer = Performer::new();
        for byte in bytes {
            self.parser.advance(&mut performer, *byte)
        }
        performer.actions
    }
}

impl Default for VteActionParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns raw pty chunks into plain text with `\n` separated lines. The
/// output column carries over between chunks so tab stops stay aligned when
/// a line arrives in pieces.
#[derive(Default)]
pub struct TextDecoder {
    parser: VteActionParser,
    column: usize,
}

impl TextDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut text = String::new();
        let column = &mut self.column;
        for action in self.parser.parse_bytes(bytes) {
            match action {
                Text(c) => {
                    text.push(c);
                    *column += c.width().unwrap_or(0);
                }
                Tab => {
                    let pad = TAB_WIDTH - *column % TAB_WIDTH;
                    text.extend(std::iter::repeat(' ').take(pad));
                    *column += pad;
                }
                LineFeed => {
                    text.push('\n');
                    *column = 0;
                }
                CursorNextLine(count) => {
                    text.extend(std::iter::repeat('\n').take(usize::from(count)));
                    *column = 0;
                }
                Backspace if *column > 0 => {
                    if let Some(erased) = text.pop() {
                        *column = column.saturating_sub(erased.width().unwrap_or(0));
                    }
                }
                Backspace => {}
                CarriageReturn => {}
            }
        }
        text
    }
}

// Private struct to hide this implementation detail
struct Performer {
    actions: Vec<VteAction>,
}

impl Performer {
    fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }
}

// Implementation largely inspired by vt100-rust:
// https://github.com/doy/vt100-rust/blob/main/src/perform.rs
impl Perform for Performer {
    fn print(&mut self, c: char) {
        self.actions.push(Text(c))
    }

    fn execute(&mut self, byte: u8) {
        let action = match byte {
            8 => Backspace,
            9 => Tab,
            10..=12 => LineFeed,
            13 => CarriageReturn,
            _ => return,
        };
        self.actions.push(action);
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], _ignore: bool, c: char) {
        if intermediates.is_empty() && c == 'E' {
            self.actions
                .push(CursorNextLine(params.canonicalize_1(1)));
        }
    }
}

trait ParamsCanonicalize {
    fn canonicalize_1(&self, default: u16) -> u16;
}

impl ParamsCanonicalize for Params {
    fn canonicalize_1(&self, default: u16) -> u16 {
        self.iter()
            .next()
            .and_then(|x| x.first().copied())
            .filter(|x| *x != 0)
            .unwrap_or(default)
    }
}
