pub mod container;
pub mod logger;

pub use container::*;
pub use logger::*;
