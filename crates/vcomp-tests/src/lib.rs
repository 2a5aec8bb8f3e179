//! Integration test crate for vcomp.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the compositor end to end on wgpu's fallback adapter, or on
//! the software device where no adapter exists.

#[cfg(test)]
mod support;

#[cfg(test)]
mod transition;

#[cfg(test)]
mod grid;

#[cfg(test)]
mod concurrency;

#[cfg(test)]
mod watermark;
