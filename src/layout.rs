use thiserror::Error;

pub const SLOT_COUNT: usize = 4;

/// A grid cell in percentages of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSlot {
    pub x: u8,
    pub y: u8,
    pub width: u8,
    pub height: u8,
}

/// Top-left, top-right, bottom-left, bottom-right.
pub const SLOTS: [LayoutSlot; SLOT_COUNT] = [
    LayoutSlot::new(0, 0, 50, 50),
    LayoutSlot::new(50, 0, 50, 50),
    LayoutSlot::new(0, 50, 50, 50),
    LayoutSlot::new(50, 50, 50, 50),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("no layout slot for pane {index}, the grid has {} slots", SLOT_COUNT)]
    OutOfRange { index: usize },
}

pub fn slot_at(index: usize) -> Result<LayoutSlot, LayoutError> {
    SLOTS
        .get(index)
        .copied()
        .ok_or(LayoutError::OutOfRange { index })
}

/// A rectangle in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.x
            && row >= self.y
            && u32::from(column) < u32::from(self.x) + u32::from(self.width)
            && u32::from(row) < u32::from(self.y) + u32::from(self.height)
    }
}

impl LayoutSlot {
    pub const fn new(x: u8, y: u8, width: u8, height: u8) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Maps the slot onto a screen of `columns` x `rows` cells. Edges are
    /// computed independently so adjacent slots share a boundary exactly.
    pub fn resolve(&self, columns: u16, rows: u16) -> Rect {
        let (x, width) = span(self.x, self.width, columns);
        let (y, height) = span(self.y, self.height, rows);
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

fn span(start: u8, length: u8, total: u16) -> (u16, u16) {
    let edge = |percent: u32| (u32::from(total) * percent.min(100) / 100) as u16;
    let from = edge(u32::from(start));
    let to = edge(u32::from(start) + u32::from(length));
    (from, to - from)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slots_match_the_two_by_two_grid() {
        assert_eq!(slot_at(0).unwrap(), LayoutSlot::new(0, 0, 50, 50));
        assert_eq!(slot_at(1).unwrap(), LayoutSlot::new(50, 0, 50, 50));
        assert_eq!(slot_at(2).unwrap(), LayoutSlot::new(0, 50, 50, 50));
        assert_eq!(slot_at(3).unwrap(), LayoutSlot::new(50, 50, 50, 50));
    }

    #[test]
    fn out_of_range_slot_is_an_error() {
        assert_eq!(slot_at(4), Err(LayoutError::OutOfRange { index: 4 }));
    }

    #[test]
    fn odd_screen_sizes_tile_without_gaps() {
        let rects: Vec<Rect> = SLOTS.iter().map(|slot| slot.resolve(81, 25)).collect();
        insta::assert_debug_snapshot!(rects, @r###"
        [
            Rect {
                x: 0,
                y: 0,
                width: 40,
                height: 12,
            },
            Rect {
                x: 40,
                y: 0,
                width: 41,
                height: 12,
            },
            Rect {
                x: 0,
                y: 12,
                width: 40,
                height: 13,
            },
            Rect {
                x: 40,
                y: 12,
                width: 41,
                height: 13,
            },
        ]
        "###);
    }

    #[test]
    fn every_cell_belongs_to_exactly_one_slot() {
        for (columns, rows) in [(80, 24), (81, 25), (3, 3), (1, 1), (0, 0)] {
            let rects: Vec<Rect> = SLOTS
                .iter()
                .map(|slot| slot.resolve(columns, rows))
                .collect();
            for row in 0..rows {
                for column in 0..columns {
                    let owners = rects
                        .iter()
                        .filter(|rect| rect.contains(column, row))
                        .count();
                    assert_eq!(owners, 1, "cell ({column}, {row}) on {columns}x{rows}");
                }
            }
        }
    }
}
