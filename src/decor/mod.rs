//! Decorations: placement core (slots, drop, board) plus the Bevy glue that
//! builds and shows them.

pub mod board;
pub mod builders;
pub mod core;
pub mod drop;
pub mod geometry;
pub mod plugin;
pub mod registry;
pub mod slots;

pub use board::DecorBoard;
pub use self::core::DecorKey;
pub use plugin::{DecorCommand, DecorNotice, DecorPlugin};
