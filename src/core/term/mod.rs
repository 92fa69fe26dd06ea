//! Console text model
//!
//! - **parser**: raw bytes to [`Input`] (UTF-8 assembly, control classification)
//! - **state**: the cursor and wrap state machine over the scrollback buffer

pub mod parser;
pub mod state;

pub use parser::Decoder;
pub use state::{Change, Changes, Cursor, Input, Screen, Terminal};
