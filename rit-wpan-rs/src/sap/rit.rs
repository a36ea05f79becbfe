//! The RIT management surface: module configuration and the
//! MLME-RIT-REQ.indication delivered when a beacon is received in sender
//! mode.

use super::{Indication, Request, Status};
use crate::{
    mac::ModuleConfig,
    pib::RitRequestPayload,
    wire::{AddressingMode, ExtendedAddress, PanId, ShortAddress},
};

/// Replace the MAC's feature-flag record and receiver policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RitModuleConfigRequest {
    pub config: ModuleConfig,
    /// Keep the receiver powered while the MAC sleeps (e.g. for a parent
    /// node that must catch every transmission).
    pub rx_always_on: bool,
}

impl Request for RitModuleConfigRequest {
    type Confirm = RitModuleConfigConfirm;
}

#[derive(Debug, Clone, Copy)]
pub struct RitModuleConfigConfirm {
    pub status: Status,
}

/// MLME-RIT-REQ.indication: a RIT Data Request arrived while this MAC was
/// waiting in sender mode.
#[derive(Debug, Clone)]
pub struct RitRequestIndication {
    pub src_addr_mode: AddressingMode,
    pub src_pan_id: PanId,
    pub src_addr: ShortAddress,
    pub src_ext_addr: ExtendedAddress,
    pub dst_addr_mode: AddressingMode,
    pub dst_pan_id: PanId,
    pub dst_addr: ShortAddress,
    pub dst_ext_addr: ExtendedAddress,
    /// The RIT request payload carried after the command identifier.
    pub rit_request_payload: RitRequestPayload,
    pub link_quality: u8,
    /// DSN of the received RIT Data Request command.
    pub dsn: u8,
    /// Reception time in units of 16 µs symbol periods.
    pub timestamp: u32,
}

impl Indication for RitRequestIndication {
    type Response = RitRequestResponse;
}

/// The upper layer's verdict on a received RIT Data Request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RitRequestResponse {
    /// Transmit the queued frame to the requester.
    pub transmit: bool,
}
