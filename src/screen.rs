use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind},
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use log::debug;
use std::io::Write;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::{
    layout::Rect,
    pane::{Pane, PaneId},
};

const BORDER_COLOR: Color = Color::Cyan;
const SCROLLBAR_COLOR: Color = Color::Yellow;
const WHEEL_ROWS: usize = 3;

/// Everything the render loop reacts to.
#[derive(Debug)]
pub enum AppEvent {
    Output { pane: PaneId, chunk: Vec<u8> },
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Escape, Ctrl+C and `q` quit.
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    match key.code {
        KeyCode::Esc => true,
        KeyCode::Char('c') | KeyCode::Char('C') => key.modifiers.contains(KeyModifiers::CONTROL),
        KeyCode::Char('q') => !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT),
        _ => false,
    }
}

/// The render surface. Owns every pane and redraws all of them on request.
pub struct Screen<W: Write> {
    output: W,
    columns: u16,
    rows: u16,
    panes: Vec<Pane>,
    needs_clear: bool,
}

impl<W: Write> Screen<W> {
    pub fn new(output: W, columns: u16, rows: u16) -> Self {
        Self {
            output,
            columns,
            rows,
            panes: Vec::new(),
            needs_clear: true,
        }
    }

    pub fn add_pane(&mut self, pane: Pane) -> PaneId {
        let id = pane.id();
        self.panes.push(pane);
        id
    }

    pub fn panes(&self) -> &[Pane] {
        &self.panes
    }

    pub fn pane(&self, id: PaneId) -> Option<&Pane> {
        self.panes.iter().find(|pane| pane.id() == id)
    }

    pub fn pane_mut(&mut self, id: PaneId) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|pane| pane.id() == id)
    }

    pub fn size(&self) -> (u16, u16) {
        (self.columns, self.rows)
    }

    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.columns = columns;
        self.rows = rows;
        self.needs_clear = true;
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Applies one event and redraws. Output and resize events always redraw;
    /// quit keys return [Flow::Quit] without touching the terminal.
    pub fn handle(&mut self, event: AppEvent) -> Result<Flow> {
        match event {
            AppEvent::Output { pane, chunk } => match self.pane_mut(pane) {
                Some(target) => target.append_output(&chunk),
                None => {
                    debug!("output for unknown pane {}", pane.0);
                    return Ok(Flow::Continue);
                }
            },
            AppEvent::Key(key) if is_quit_key(&key) => return Ok(Flow::Quit),
            AppEvent::Key(_) => return Ok(Flow::Continue),
            AppEvent::Mouse(mouse) => {
                if !self.scroll(mouse) {
                    return Ok(Flow::Continue);
                }
            }
            AppEvent::Resize(columns, rows) => self.resize(columns, rows),
        }
        self.render()?;
        Ok(Flow::Continue)
    }

    fn scroll(&mut self, mouse: MouseEvent) -> bool {
        let (columns, rows) = (self.columns, self.rows);
        let Some(pane) = self
            .panes
            .iter_mut()
            .find(|pane| pane.slot().resolve(columns, rows).contains(mouse.column, mouse.row))
        else {
            return false;
        };
        match mouse.kind {
            MouseEventKind::ScrollUp => pane.scroll_up(WHEEL_ROWS),
            MouseEventKind::ScrollDown => pane.scroll_down(WHEEL_ROWS),
            _ => return false,
        }
        true
    }

    /// Full redraw of every pane.
    pub fn render(&mut self) -> Result<()> {
        if self.needs_clear {
            queue!(self.output, ResetColor, Clear(ClearType::All))?;
            self.needs_clear = false;
        }
        for pane in &mut self.panes {
            let rect = pane.slot().resolve(self.columns, self.rows);
            draw_pane(&mut self.output, pane, rect)?;
        }
        self.output.flush()?;
        Ok(())
    }
}

fn draw_pane(out: &mut impl Write, pane: &mut Pane, rect: Rect) -> Result<()> {
    if rect.width < 2 || rect.height < 2 {
        return Ok(());
    }
    let inner_width = usize::from(rect.width - 2);
    let inner_height = usize::from(rect.height - 2);
    let has_scrollbar = inner_width >= 2;
    let text_width = if has_scrollbar {
        inner_width - 1
    } else {
        inner_width
    };
    let horizontal = "─".repeat(inner_width);

    queue!(
        out,
        MoveTo(rect.x, rect.y),
        SetForegroundColor(BORDER_COLOR),
        Print('┌'),
        Print(&horizontal),
        Print('┐')
    )?;
    let label = fit(&format!(" {} ", pane.title()), inner_width);
    queue!(
        out,
        MoveTo(rect.x + 1, rect.y),
        SetForegroundColor(pane.label_color()),
        SetAttribute(Attribute::Bold),
        Print(label),
        SetAttribute(Attribute::Reset)
    )?;

    let viewport = pane.viewport(text_width, inner_height);
    for row in 0..inner_height {
        let text = viewport.rows.get(row).map(String::as_str).unwrap_or("");
        let padding = text_width.saturating_sub(text.width());
        queue!(
            out,
            MoveTo(rect.x, rect.y + 1 + row as u16),
            SetForegroundColor(BORDER_COLOR),
            Print('│'),
            ResetColor,
            Print(text),
            Print(" ".repeat(padding))
        )?;
        if has_scrollbar {
            let on_thumb = viewport
                .thumb
                .is_some_and(|(start, length)| row >= start && row < start + length);
            if on_thumb {
                queue!(out, SetBackgroundColor(SCROLLBAR_COLOR), Print(' '), ResetColor)?;
            } else {
                queue!(out, Print(' '))?;
            }
        }
        queue!(out, SetForegroundColor(BORDER_COLOR), Print('│'))?;
    }

    queue!(
        out,
        MoveTo(rect.x, rect.y + rect.height - 1),
        SetForegroundColor(BORDER_COLOR),
        Print('└'),
        Print(&horizontal),
        Print('┘'),
        ResetColor
    )?;
    Ok(())
}

/// Longest prefix of `text` that fits in `cells` terminal columns.
fn fit(text: &str, cells: usize) -> String {
    let mut used = 0;
    text.chars()
        .take_while(|ch| {
            used += ch.width().unwrap_or(0);
            used <= cells
        })
        .collect()
}
