//! Deterministic simulation harness for `rit-wpan-rs`: a virtual clock, a
//! shared radio medium and a single-threaded runner that advances time only
//! when every task is parked.

pub mod aether;
pub mod run;
pub mod time;
