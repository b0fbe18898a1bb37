pub mod production;
pub mod types;

pub use production::*;
pub use types::*;
