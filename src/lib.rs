/*
Fixed 2x2 grid of panes, each tailing the output of its own process.

Startup:
    config.json -> Vec<PaneSpec> (at most four, one per grid slot)
    pane per spec, positioned by its index in the config
    filtered panes spawn `<binary> --filter <filter>` under a pty
    unfiltered panes show a placeholder line

Runtime:
    pty reader threads -> per-process channel -> screen event channel
    terminal input thread -> screen event channel
    every event is applied to the screen, followed by a full redraw
*/
pub mod config;
pub mod driver;
pub mod layout;
pub mod pane;
pub mod process;
pub mod screen;
mod vte_actions;

pub use config::{load_config, ConfigError, PaneSpec};
pub use driver::Options;
pub use screen::Screen;
