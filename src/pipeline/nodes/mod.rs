//! The five list operators. Each wraps one upstream (Merge wraps a set of them)
//! and republishes an equivalent event stream for its own projection.

pub mod dispatch;
pub mod filter;
pub mod map;
pub mod merge;
pub mod order;

#[cfg(test)]
mod testing;

pub use dispatch::DispatchList;
pub use filter::FilterList;
pub use map::{MapList, Mapper};
pub use merge::MergeList;
pub use order::OrderList;
