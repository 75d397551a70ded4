//! Terminal dashboard for ttop (renderer, terminal lifecycle, monitor task).

pub mod monitor;
pub mod render;
pub mod terminal;
