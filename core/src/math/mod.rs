pub mod narrow;
pub mod polygon;
pub mod units;

pub use narrow::{narrow_to, EventValue};
pub use polygon::Polygon;
