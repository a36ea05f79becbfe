use rand_core::RngCore;

use crate::{
    consts::MAX_PHY_PACKET_SIZE,
    phy::Phy,
    pib::MacPib,
    sap::{
        data::{DataConfirm, DataRequest},
        Status,
    },
    time::DelayNsExt,
    wire::{self, Address, AddressingMode},
};

use super::{
    commander::RequestResponder,
    rit,
    state::{MacState, RitMode, TxQueueElement},
    MacConfig,
};

/// MCPS-DATA.request: validate, build the MAC header and enqueue. The frame
/// is not transmitted here; the confirm is answered when the transmission
/// reaches a terminal outcome.
pub async fn process_data_request<'a, Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    config: &mut MacConfig<Rng, Delay>,
    responder: RequestResponder<'a, DataRequest>,
) {
    let request = responder.request.clone();
    let msdu_handle = request.msdu_handle;

    let fail = |responder: RequestResponder<'a, DataRequest>, status: Status| {
        responder.respond(DataConfirm {
            msdu_handle,
            status,
        });
    };

    if request.src_addr_mode == AddressingMode::None
        && request.dst_addr_mode == AddressingMode::None
    {
        error!("Can not send a frame with no address field");
        return fail(responder, Status::InvalidAddress);
    }

    if matches!(request.src_addr_mode, AddressingMode::Reserved)
        || matches!(request.dst_addr_mode, AddressingMode::Reserved)
    {
        error!("Can not send a frame with a reserved addressing mode");
        return fail(responder, Status::InvalidAddress);
    }

    if request.tx_options.gts || request.tx_options.indirect {
        error!("GTS and indirect transmission are not supported");
        return fail(responder, Status::InvalidParameter);
    }

    let source = match request.src_addr_mode {
        AddressingMode::Short => Some(Address::Short(mac_pib.pan_id, mac_pib.short_address)),
        AddressingMode::Extended => {
            Some(Address::Extended(mac_pib.pan_id, mac_pib.extended_address))
        }
        _ => None,
    };

    let destination = match request.dst_addr_mode {
        AddressingMode::Short => Some(Address::Short(request.dst_pan_id, request.dst_addr)),
        AddressingMode::Extended => {
            Some(Address::Extended(request.dst_pan_id, request.dst_ext_addr))
        }
        _ => None,
    };

    // 7.5.6.1: when both PAN ids are present and equal, only the destination
    // PAN is serialized
    let pan_id_compress = match (&source, &destination) {
        (Some(src), Some(dst)) => src.pan_id() == dst.pan_id(),
        _ => false,
    };

    // An ACK must not be requested from a broadcast or multicast destination
    let mut ack_request = request.tx_options.ack;
    if ack_request {
        if let Some(Address::Short(_, short)) = &destination {
            if short.is_broadcast() || short.is_multicast() {
                debug!(
                    "ACK requested on broadcast or multicast destination {}, removing it",
                    short
                );
                ack_request = false;
            }
        }
    }

    let header = wire::Header {
        frame_type: wire::FrameType::Data,
        security_enabled: false,
        frame_pending: false,
        ack_request,
        pan_id_compress,
        version: wire::FrameVersion::Ieee802154_2003,
        seq: mac_pib.dsn.next(),
        destination,
        source,
    };

    let fcs_len = if mac_pib.fcs_enabled { 2 } else { 0 };
    if header.serialized_len() + request.msdu.len() + fcs_len > MAX_PHY_PACKET_SIZE {
        error!("Frame too long: {} octet msdu", request.msdu.len());
        return fail(responder, Status::FrameTooLong);
    }

    let element = TxQueueElement {
        msdu_handle,
        header,
        msdu: request.msdu,
        retries: 0,
        responder,
    };

    if let Err(element) = mac_state.tx_queue.push_back(element) {
        error!("Transmit queue full, dropping msdu {}", msdu_handle);
        return fail(element.responder, Status::TransactionOverflow);
    }

    if !mac_pib.is_rit_enabled() {
        rit::check_direct_tx(phy, mac_pib, mac_state, config).await;
    } else if mac_state.rit_mode == RitMode::Sleep {
        rit::check_tx_and_start_sender(phy, mac_pib, mac_state).await;
    }
}
