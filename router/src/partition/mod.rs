pub mod layout;
pub mod pool;
pub mod region;

pub use layout::Layout;
pub use pool::{ClaimedRegion, WorkPool};
pub use region::Region;
