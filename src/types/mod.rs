//! Core data types shared by the generator, the scheduling loop and sinks.

mod frame;

pub use frame::Frame;
