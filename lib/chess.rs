mod color;
mod fen;
mod outcome;
mod pgn;
mod position;
mod san;

pub use color::*;
pub use fen::*;
pub use outcome::*;
pub use pgn::*;
pub use position::*;
pub use san::*;
