mod dirty;
mod gate;
mod ring;
mod slot;

pub use dirty::*;
pub use gate::*;
pub use ring::*;
pub use slot::*;
