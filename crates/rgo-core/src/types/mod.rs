//! 基本型

mod color;
mod legality;
mod mv;

pub use color::Color;
pub use legality::Legality;
pub use mv::Move;
