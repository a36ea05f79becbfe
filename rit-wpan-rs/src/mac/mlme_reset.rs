use rand_core::RngCore;

use crate::{
    phy::Phy,
    pib::MacPib,
    sap::{
        data::DataConfirm,
        reset::{ResetConfirm, ResetRequest},
        Status,
    },
    time::DelayNsExt,
};

use super::{
    commander::RequestResponder,
    state::{MacEngineState, MacState, RitMode, TimerSlots},
    MacConfig,
};

/// MLME-RESET.request: cancel everything, flush the queue and return the MAC
/// to the disabled state.
pub async fn process_reset_request<'a, Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    _config: &mut MacConfig<Rng, Delay>,
    responder: RequestResponder<'a, ResetRequest>,
) {
    mac_state.timers = TimerSlots::default();
    mac_state.channel_access.cancel();
    mac_state.rit_sending = false;
    mac_state.continuous_rx = false;
    mac_state.last_rx_rit_req_src = None;
    mac_state.change_rit_mode(RitMode::Disabled);
    mac_state.change_engine_state(MacEngineState::Idle);

    // Frames still queued will never be transmitted
    while let Some(element) = mac_state.tx_queue.pop_front() {
        let msdu_handle = element.msdu_handle;
        element.responder.respond(DataConfirm {
            msdu_handle,
            status: Status::TransactionExpired,
        });
    }

    if responder.request.set_default_pib {
        *mac_pib = MacPib::new(mac_pib.extended_address);
    }

    let status = match phy.reset().await {
        Ok(()) => Status::Success,
        Err(_) => Status::PhyError,
    };

    responder.respond(ResetConfirm { status });
}
