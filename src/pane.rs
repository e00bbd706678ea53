use crossterm::style::Color;
use std::collections::VecDeque;
use unicode_width::UnicodeWidthChar;

use crate::{layout::LayoutSlot, vte_actions::TextDecoder};

pub const DEFAULT_SCROLLBACK: usize = 10_000;

/// Label colors, picked by pane index modulo the palette length.
pub const PALETTE: [Color; 5] = [
    Color::White,
    Color::Green,
    Color::Red,
    Color::Rgb {
        r: 255,
        g: 165,
        b: 0,
    },
    Color::Blue,
];

pub fn palette_color(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaneId(pub usize);

/// A bordered, labeled, independently scrolling view bound to one grid slot.
pub struct Pane {
    id: PaneId,
    title: String,
    slot: LayoutSlot,
    lines: VecDeque<String>,
    scrollback: usize,
    /// Wrapped rows between the bottom of the view and the newest row.
    offset: usize,
    decoder: TextDecoder,
}

/// The rows a pane shows for a given inner size, plus where the scrollbar
/// thumb sits.
#[derive(Debug, PartialEq, Eq)]
pub struct Viewport {
    pub rows: Vec<String>,
    pub thumb: Option<(usize, usize)>,
}

impl Pane {
    pub fn new(id: PaneId, title: impl Into<String>, slot: LayoutSlot, scrollback: usize) -> Self {
        Self {
            id,
            title: title.into(),
            slot,
            lines: VecDeque::new(),
            scrollback: scrollback.max(1),
            offset: 0,
            decoder: TextDecoder::new(),
        }
    }

    pub fn id(&self) -> PaneId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slot(&self) -> LayoutSlot {
        self.slot
    }

    pub fn label_color(&self) -> Color {
        palette_color(self.id.0)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Appends trimmed text (split on newlines) and jumps to the newest content.
    pub fn append_line(&mut self, text: &str) {
        for line in text.trim().split('\n') {
            if self.lines.len() == self.scrollback {
                self.lines.pop_front();
            }
            self.lines.push_back(line.trim_end_matches('\r').to_string());
        }
        self.scroll_to_bottom();
    }

    /// Appends a line that has no process behind it.
    pub fn append_static(&mut self, text: &str) {
        self.append_line(text)
    }

    /// Decodes a raw pty chunk and appends the resulting text.
    pub fn append_output(&mut self, chunk: &[u8]) {
        let text = self.decoder.decode(chunk);
        self.append_line(&text)
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.offset = self.offset.saturating_add(rows);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.offset = self.offset.saturating_sub(rows);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = 0;
    }

    pub fn is_pinned(&self) -> bool {
        self.offset == 0
    }

    /// Wraps the buffer at `width` and returns the `height` rows ending
    /// `offset` rows above the bottom. Clamps the stored offset so scrolling
    /// back down after overshooting the top takes effect immediately.
    pub fn viewport(&mut self, width: usize, height: usize) -> Viewport {
        if width == 0 || height == 0 {
            return Viewport {
                rows: Vec::new(),
                thumb: None,
            };
        }

        let total: usize = self
            .lines
            .iter()
            .map(|line| wrapped_len(line, width))
            .sum();
        self.offset = self.offset.min(total.saturating_sub(height));

        let mut rows: Vec<String> = self
            .lines
            .iter()
            .rev()
            .flat_map(|line| wrap(line, width).into_iter().rev())
            .skip(self.offset)
            .take(height)
            .collect();
        rows.reverse();

        let thumb = (total > height).then(|| {
            let top = total - self.offset - height;
            let length = (height * height / total).max(1);
            let start = top * (height - length) / (total - height);
            (start, length)
        });

        Viewport { rows, thumb }
    }
}

fn wrapped_len(line: &str, width: usize) -> usize {
    wrap(line, width).len()
}

/// Splits `line` into rows no wider than `width` terminal cells. A double
/// width character never straddles the edge; one that cannot fit a row at
/// all is shown as `?`.
fn wrap(line: &str, width: usize) -> Vec<String> {
    let mut rows = vec![String::new()];
    let mut used = 0;
    for ch in line.chars() {
        let (ch, cells) = match ch.width().unwrap_or(0) {
            cells if cells > width => ('?', 1),
            cells => (ch, cells),
        };
        if used + cells > width {
            rows.push(String::new());
            used = 0;
        }
        if let Some(row) = rows.last_mut() {
            row.push(ch);
        }
        used += cells;
    }
    rows
}
