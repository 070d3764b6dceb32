#![doc = include_str!("../README.md")]

mod error;

pub mod encapsulation;
pub mod framing;
pub mod receiver;
pub mod spacepacket;

pub use error::{Error, Result};
