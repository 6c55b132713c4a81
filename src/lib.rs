//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (currently just `core-decode`). Host applications can
//! depend on `mpegdec-workspace` and enable the documented features without
//! needing to wire each crate individually.
