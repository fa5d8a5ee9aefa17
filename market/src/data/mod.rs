//! Candle data types
//!
//! The canonical in-memory candle, the interval table and the durable record shape.

pub mod candle;
pub mod interval;
pub mod record;

pub use candle::*;
pub use interval::*;
pub use record::*;
