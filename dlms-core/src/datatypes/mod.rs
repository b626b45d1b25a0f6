//! Data types used in DLMS/COSEM protocol

pub mod bit_string;
pub mod compact_array;
pub mod data_value;
pub mod date_time;

// Re-export types
pub use bit_string::BitString;
pub use compact_array::{CompactArray, TypeDescription};
pub use data_value::{DataType, DataValue};
pub use date_time::{ClockStatus, CosemDateTime};
