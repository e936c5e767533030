pub mod locks;
pub mod resolver;

pub use locks::BoundaryLocks;
pub use resolver::{BoundaryResolver, ResolverStats, Strategy};
