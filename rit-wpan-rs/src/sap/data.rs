//! MCPS-DATA.request / confirm / indication.

use heapless::Vec;

use super::{Indication, Request, Status};
use crate::{
    consts::MAX_PHY_PACKET_SIZE,
    wire::{AddressingMode, ExtendedAddress, PanId, ShortAddress},
};

/// An MSDU as handed over the MCPS surface. Sized to the PHY packet so that
/// over-long payloads can be represented and rejected with
/// [`Status::FrameTooLong`].
pub type MacPayload = Vec<u8, MAX_PHY_PACKET_SIZE>;

/// The transmit options of 8.2.18.2: only acknowledged transmission is
/// supported; GTS and indirect transmission are rejected with
/// [`Status::InvalidParameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct TxOptions {
    pub ack: bool,
    pub gts: bool,
    pub indirect: bool,
}

impl TxOptions {
    pub const fn acknowledged() -> Self {
        Self {
            ack: true,
            gts: false,
            indirect: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataRequest {
    pub src_addr_mode: AddressingMode,
    pub dst_addr_mode: AddressingMode,
    pub dst_pan_id: PanId,
    pub dst_addr: ShortAddress,
    pub dst_ext_addr: ExtendedAddress,
    pub msdu_handle: u8,
    pub tx_options: TxOptions,
    pub msdu: MacPayload,
}

impl Request for DataRequest {
    type Confirm = DataConfirm;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct DataConfirm {
    pub msdu_handle: u8,
    pub status: Status,
}

#[derive(Debug, Clone)]
pub struct DataIndication {
    pub src_addr_mode: AddressingMode,
    pub src_pan_id: PanId,
    pub src_addr: ShortAddress,
    pub src_ext_addr: ExtendedAddress,
    pub dst_addr_mode: AddressingMode,
    pub dst_pan_id: PanId,
    pub dst_addr: ShortAddress,
    pub dst_ext_addr: ExtendedAddress,
    pub mpdu_link_quality: u8,
    pub dsn: u8,
    pub msdu: MacPayload,
}

impl Indication for DataIndication {
    type Response = ();
}
