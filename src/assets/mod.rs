pub mod batch;
pub mod ids;
pub mod locator;
pub mod texture;
pub mod workspace;

pub use batch::*;
pub use ids::*;
pub use locator::*;
pub use workspace::*;
