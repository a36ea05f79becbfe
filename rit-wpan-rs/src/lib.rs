#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![allow(async_fn_in_trait)]

use crate::wire::{ExtendedAddress, ShortAddress};

// This must go FIRST so that all the other modules see its macros.
mod fmt;

pub mod consts;
pub mod device;
pub mod drift;
pub mod mac;
pub mod nwk;
pub mod phy;
pub mod pib;
mod reqresp;
pub mod sap;
pub mod time;
pub mod wire;

/// A destination as seen from the net-device surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAddress {
    Short(ShortAddress),
    Extended(ExtendedAddress),
}
