// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators shown on the
// dashboard. Every series function returns one entry per input close so the
// result lines up with the price table row-for-row; rows without enough
// history are `None`.

pub mod ema;
pub mod rsi;
pub mod sma;

pub use ema::calculate_ema;
pub use rsi::{calculate_rsi, rsi_zone, RsiSmoothing};
pub use sma::calculate_sma;
