//! The orchestrating control loop. Split into the outer retry wrapper
//! ([`engine`]), the inner per-tick pass ([`tick`]), and per-payment
//! classification/action ([`payment`]).

pub mod engine;
pub mod payment;
pub mod tick;
