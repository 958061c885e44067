//! Types and traits for recording step and evaluation information.
//!
//! * [`Record`] - A container for storing key-value pairs of various data types
//! * [`RecordValue`] - The types of values a record can hold
//! * [`Recorder`] - A sink that records are written to
//! * [`BufferedRecorder`] - A recorder that keeps records in memory
//! * [`NullRecorder`] - A recorder that discards all records
//!
//! ```rust
//! use hrl_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("reward", RecordValue::Scalar(0.9));
//! record.insert("task", RecordValue::String("X".to_string()));
//! assert_eq!(record.get_scalar("reward").unwrap(), 0.9);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
