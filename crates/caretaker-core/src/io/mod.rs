//! Low-level I/O helpers: disk images and filesystem moves.

pub mod dmg;
pub mod fsops;
