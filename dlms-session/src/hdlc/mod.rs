//! HDLC frame decoding

pub mod address;
pub mod fcs;
pub mod frame;
pub mod parameters;

pub use address::{HdlcAddress, reserved};
pub use fcs::{FcsCalc, fcs16};
pub use frame::{CheckSequence, Control, FLAG, FrameFormat, FrameType, HdlcFrame};
pub use parameters::{LinkParameter, decode_parameters};
