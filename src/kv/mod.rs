//! Consistent reads spanning many keys.

mod multi_get;
pub use multi_get::*;
