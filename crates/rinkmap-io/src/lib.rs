//! rinkmap-io: Browser I/O and Dioxus component library.
//!
//! Everything in `rinkmap-core` that needs the browser is implemented
//! here: the `localStorage` [`Storage`](rinkmap_core::Storage) backend,
//! canvas rasterisation for the colour sampler, DOM layout measurement
//! and the console logger. The Dioxus components render engine state
//! and report raw input back to the app.

pub mod components;
pub mod layout;
pub mod logger;
pub mod raster;
pub mod storage;

pub use components::{BoxPointer, FilterBar, MarkerDot, RinkBox, StatusBar, TimeGrid};
pub use storage::LocalStorage;
