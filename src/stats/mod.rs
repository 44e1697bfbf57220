//! Raw container statistics and the metrics derived from them.
//!
//! - [`StatsDecoder`] turns the runtime's byte stream into [`RawSample`]s.
//! - [`derive`] and [`Deriver`] turn consecutive samples into [`DerivedMetric`]s.

mod decoder;
mod derive;
mod error;
mod sample;

pub use decoder::{MAX_RECORD_LEN, StatsDecoder};
pub use derive::{DerivedMetric, Deriver, derive};
pub use error::{DecodeError, DeriveError};
pub use sample::{InterfaceCounters, RawSample};
