//! Dioxus UI components for rinkmap.
//!
//! Provides the rink-diagram box with its markers, the time-bucket
//! grid, the scorer/goalie filter bar and the workflow status line.

mod filter_bar;
mod rink_box;
mod status_bar;
mod time_grid;

pub use filter_bar::FilterBar;
pub use rink_box::{BoxPointer, MarkerDot, RinkBox};
pub use status_bar::StatusBar;
pub use time_grid::TimeGrid;
