pub mod catalog;
pub mod source;

pub use catalog::Catalog;
pub use source::{ByteRange, RangeSource};
