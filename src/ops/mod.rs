//! Table transformations.
//!
//! Each operation takes feature tables in and produces a new table (or a
//! report) out; nothing here touches the filesystem or draws anything.

pub mod aggregate;
pub mod join;
pub mod points;
pub mod spatial;

pub use aggregate::sum_by;
pub use join::inner_join;
pub use points::attach_points;
pub use spatial::spatial_join;
