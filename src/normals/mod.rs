//! Shared normals, smoothing groups and the derivations between them.
//!
//! Smoothing groups and shared normals describe the same thing from two
//! sides: [`GeomDataObject::update_normal_sharing_from_smoothing`] derives
//! the per-corner grouping from the polygon groups, and
//! [`GeomDataObject::update_smoothing`] derives the polygon groups back
//! from the per-corner grouping.
//!
//! [`GeomDataObject::update_normal_sharing_from_smoothing`]: crate::object::GeomDataObject::update_normal_sharing_from_smoothing
//! [`GeomDataObject::update_smoothing`]: crate::object::GeomDataObject::update_smoothing

mod averaging;
mod edit;
mod sharing;
mod smoothing;

pub use edit::{LockNormals, ShareNormals, UnshareNormals};
