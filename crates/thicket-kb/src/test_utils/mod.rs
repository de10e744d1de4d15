//! Test doubles and fixtures

pub mod fakes;

#[cfg(feature = "mocks")]
pub mod mocks;

pub use fakes::*;
#[cfg(feature = "mocks")]
pub use mocks::*;
