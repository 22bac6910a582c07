//! Streaming analysis stages
//!
//! Each confirmed bar flows through the stages in order:
//!
//! - **pivot**: swing High/Low confirmation over a `2L + 1` window
//! - **fibonacci**: retracement / extension level set for the latest anchor pair
//! - **wave**: simplified Elliott-Wave count over the pivot sequence
//! - **scenario**: lifecycle of the single Active scenario and its drawable handles
//! - **alerts**: boolean signals, recomputed on every bar
//!
//! Pivot, level, wave and scenario work happens only when a pivot is confirmed; alerts are
//! evaluated for every bar, confirmed or not.

pub mod helpers;

pub mod alerts;
pub mod fibonacci;
pub mod pivot;
pub mod scenario;
pub mod wave;

pub use alerts::*;
pub use fibonacci::*;
pub use helpers::RingBuffer;
pub use pivot::*;
pub use scenario::*;
pub use wave::*;
