//! SSA construction front end: the builder surface a parser drives, plus
//! the def-timeline, resolution, propagation, and static-lowering machinery
//! it's built on.
//!
//! `ssagen-ir` owns the data model; this crate owns the algorithm, the same
//! split as `cranelift-codegen`'s `ir` module versus `cranelift-frontend`.

pub mod builder;
pub mod lower;
pub mod propagate;
pub mod resolve;
pub mod timeline;

pub use builder::{FunctionBuilder, ValueOperand};
pub use timeline::{DefTimeline, IncomingJoin, TimelineRef, TimelineTable, UseSite};
