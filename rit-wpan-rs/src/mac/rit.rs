//! The RIT duty-cycle protocol: the periodic receiver cycle, the sender
//! cycle with its beacon wait window, and the reception filter feeding both.

use rand::Rng as _;
use rand_core::RngCore;

use crate::{
    drift::{ClockDriftApplier, TimeDriftApplier},
    phy::{Phy, ReceivedMessage, SendContinuation},
    pib::{MacPib, RitRequestPayload},
    sap::{
        data::{DataConfirm, DataIndication, MacPayload},
        rit::RitRequestIndication,
        Status,
    },
    time::{DelayNsExt, Duration, Instant},
    wire::{
        Address, AddressingMode, Command, ExtendedAddress, FooterMode, Frame, FrameContent,
        FrameType, FrameVersion, Header, PanId, ShortAddress,
    },
};

use super::{
    channel_access::{CcaVerdict, ChannelAccessChain, FrontEnd},
    commander::MacHandler,
    state::{MacEngineState, MacState, RitMode},
    MacConfig,
};

/// The ratio handed to the jitter applier when beacon randomization is on:
/// each interval is drawn from [0.5, 1.5] times the drift-adjusted period.
const BEACON_RANDOMIZE_RATIO: f64 = 50.0;

/// Jitter ratio preconfigured on the applier itself.
const DEFAULT_DRIFT_RATIO: f64 = 10.0;

pub(super) enum ChannelAccessOutcome {
    ChannelIdle,
    Failure,
}

fn footer_mode(mac_pib: &MacPib) -> FooterMode {
    if mac_pib.fcs_enabled {
        FooterMode::Explicit
    } else {
        FooterMode::None
    }
}

async fn current_time(phy: &mut impl Phy) -> Option<Instant> {
    match phy.get_instant().await {
        Ok(now) => Some(now),
        Err(_) => {
            error!("Could not get the current time from the phy");
            None
        }
    }
}

fn addressing(
    address: &Option<Address>,
) -> (AddressingMode, PanId, ShortAddress, ExtendedAddress) {
    match address {
        None => (
            AddressingMode::None,
            PanId::broadcast(),
            ShortAddress::BROADCAST,
            ExtendedAddress::BROADCAST,
        ),
        Some(Address::Short(pan_id, short)) => (
            AddressingMode::Short,
            *pan_id,
            *short,
            ExtendedAddress::BROADCAST,
        ),
        Some(Address::Extended(pan_id, extended)) => (
            AddressingMode::Extended,
            *pan_id,
            ShortAddress::BROADCAST,
            *extended,
        ),
    }
}

// ---------------------------------------------------------------------------
// Cycle control
// ---------------------------------------------------------------------------

/// Start the periodic RIT schedule. The first wakeup is placed uniformly in
/// `[0, period)` so a population of nodes does not beacon in lockstep.
pub(super) async fn start_rit_cycle<Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'_>,
    config: &mut MacConfig<Rng, Delay>,
) -> Status {
    let period = mac_pib.rit_period_time();
    let data_wait = mac_pib.rit_data_wait_duration_time();

    if period < data_wait {
        error!(
            "RIT period {} must not be shorter than the data wait duration {}",
            period, data_wait
        );
        return Status::InvalidParameter;
    }

    if mac_state.engine_state != MacEngineState::Idle {
        debug!("MAC is busy, RIT cycle start deferred");
        return Status::Success;
    }

    let Some(now) = current_time(phy).await else {
        return Status::PhyError;
    };

    debug!("Starting RIT cycle with period {}", period);

    mac_state.change_rit_mode(RitMode::Sleep);
    mac_pib.rx_on_when_idle = false;

    let node_id = mac_pib.short_address.0 as u32;
    mac_state.clock_drift = Some(ClockDriftApplier::new(node_id, config.run_id));
    let mut time_drift = TimeDriftApplier::new(node_id);
    time_drift.set_drift_ratio(DEFAULT_DRIFT_RATIO);
    mac_state.time_drift = Some(time_drift);

    let phase = Duration::from_ticks(config.rng.gen_range(0..period.ticks().max(1)));
    mac_state.timers.periodic_rit_data_request = Some(now + phase);

    Status::Success
}

/// Cancel the periodic schedule and any open wait window, returning the MAC
/// to the disabled state within the same virtual instant.
pub(super) fn stop_rit_cycle(mac_state: &mut MacState<'_>) {
    debug!("Stopping RIT cycle");

    mac_state.timers.periodic_rit_data_request = None;
    mac_state.timers.rit_data_wait = None;
    mac_state.timers.rit_tx_wait = None;
    mac_state.channel_access.cancel();
    mac_state.rit_sending = false;

    mac_state.change_rit_mode(RitMode::Disabled);
    mac_state.change_engine_state(MacEngineState::Idle);
}

/// The periodic wakeup. Re-arms itself with the drift-adjusted interval,
/// then either skips (sender busy), turns sender (queued traffic), or
/// beacons as a receiver.
pub(super) async fn periodic_rit_data_request<Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'_>,
    config: &mut MacConfig<Rng, Delay>,
) {
    mac_state.timers.periodic_rit_data_request = None;

    if !mac_pib.is_rit_enabled() || mac_state.rit_mode == RitMode::Disabled {
        debug!("Periodic wakeup while RIT is disabled, ignoring");
        return;
    }

    let mut interval = mac_pib.rit_period_time();
    if let Some(clock_drift) = mac_state.clock_drift.as_mut() {
        interval = clock_drift.apply(interval);
    }
    if mac_state.module_config.beacon_randomize {
        if let Some(time_drift) = mac_state.time_drift.as_mut() {
            interval = time_drift.apply_by_ratio(interval, BEACON_RANDOMIZE_RATIO);
            debug!("Beacon interval randomized to {}", interval);
        }
    }

    let Some(now) = current_time(phy).await else {
        return;
    };
    mac_state.timers.periodic_rit_data_request = Some(now + interval);

    if mac_state.rit_mode == RitMode::Sender {
        debug!("In sender mode, skipping the RIT data request");
        return;
    }

    if check_tx_and_start_sender(phy, mac_pib, mac_state).await {
        return;
    }

    mac_state.change_rit_mode(RitMode::Receiver);
    do_send_rit_data_request(phy, mac_pib, mac_state, config).await;
}

// ---------------------------------------------------------------------------
// Receiver cycle
// ---------------------------------------------------------------------------

/// Build and transmit the RIT Data Request command, then open the data wait
/// window.
async fn do_send_rit_data_request<Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'_>,
    config: &mut MacConfig<Rng, Delay>,
) {
    debug_assert_eq!(mac_state.engine_state, MacEngineState::Idle);

    let seq = mac_pib.dsn.next();

    let header = if mac_state.module_config.compact_rit_data_request {
        // Source-only addressing keeps the beacon minimal
        Header {
            frame_type: FrameType::MacCommand,
            security_enabled: false,
            frame_pending: false,
            ack_request: false,
            pan_id_compress: true,
            version: FrameVersion::Ieee802154_2006,
            seq,
            destination: None,
            source: Some(Address::Short(mac_pib.pan_id, mac_pib.short_address)),
        }
    } else {
        Header {
            frame_type: FrameType::MacCommand,
            security_enabled: false,
            frame_pending: false,
            ack_request: false,
            pan_id_compress: false,
            version: FrameVersion::Ieee802154_2006,
            seq,
            destination: Some(Address::Short(mac_pib.pan_id, ShortAddress::BROADCAST)),
            source: Some(Address::Short(mac_pib.pan_id, mac_pib.short_address)),
        }
    };

    let data = mac_state.serialize_frame(
        Frame {
            header,
            content: FrameContent::Command(Command::RitDataRequest),
            payload: &mac_pib.rit.request_payload,
        },
        footer_mode(mac_pib),
    );

    if let Some(front_end) = mac_state.module_config.beacon_front_end() {
        mac_state.change_engine_state(MacEngineState::Csma);
        match perform_channel_access(phy, &mut mac_state.channel_access, front_end, config).await {
            ChannelAccessOutcome::ChannelIdle => {}
            ChannelAccessOutcome::Failure => {
                debug!("Beacon channel access failed, ending the receiver cycle");
                mac_state.change_engine_state(MacEngineState::Idle);
                end_receiver_cycle(phy, mac_pib, mac_state).await;
                return;
            }
        }
    }

    mac_state.change_engine_state(MacEngineState::Sending);
    match phy
        .send(&data, None, SendContinuation::ReceiveContinuous)
        .await
    {
        Ok(sent_at) => {
            trace!("RIT data request transmitted at {}", sent_at);
            mac_state.change_engine_state(MacEngineState::Idle);
            let Some(now) = current_time(phy).await else {
                return;
            };
            debug!("data_wait start at {}", now);
            start_rit_data_wait_period(now, mac_pib, mac_state);
        }
        Err(_) => {
            error!("RIT data request transmission failed");
            mac_state.change_engine_state(MacEngineState::Idle);
            end_receiver_cycle(phy, mac_pib, mac_state).await;
        }
    }
}

/// Keep the receiver on and arm the data wait timeout. A zero window is
/// skipped entirely.
fn start_rit_data_wait_period(now: Instant, mac_pib: &mut MacPib, mac_state: &mut MacState<'_>) {
    debug_assert_eq!(mac_state.rit_mode, RitMode::Receiver);

    mac_pib.rx_on_when_idle = true;
    mac_state.change_engine_state(MacEngineState::Idle);

    let wait = mac_pib.rit_data_wait_duration_time();
    if !wait.is_positive() {
        debug!("RIT data wait duration is zero, window skipped");
        return;
    }

    mac_state.timers.rit_data_wait = Some(now + wait);
}

pub(super) async fn receiver_cycle_timeout(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'_>,
) {
    mac_state.timers.rit_data_wait = None;

    if !(mac_pib.is_rit_enabled() && mac_state.rit_mode == RitMode::Receiver) {
        debug!("Data wait timeout in mode {}, ignoring", mac_state.rit_mode);
        return;
    }

    debug!("data_wait timeout");
    end_receiver_cycle(phy, mac_pib, mac_state).await;
}

async fn end_receiver_cycle(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'_>,
) {
    if mac_state.rit_mode != RitMode::Receiver {
        warn!(
            "Receiver cycle end requested in mode {}, ignoring",
            mac_state.rit_mode
        );
        return;
    }

    debug!("data_wait end");
    mac_state.timers.rit_data_wait = None;
    set_sleep(phy, mac_pib, mac_state).await;
}

// ---------------------------------------------------------------------------
// Sender cycle
// ---------------------------------------------------------------------------

/// Switch to sender mode and open the beacon wait window when the queue
/// holds at least one frame.
pub(super) async fn check_tx_and_start_sender(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'_>,
) -> bool {
    if !mac_pib.is_rit_enabled() || mac_state.tx_queue.is_empty() {
        return false;
    }

    if mac_state.rit_mode == RitMode::Sender {
        return false;
    }

    debug!("tx queue size: {}", mac_state.tx_queue.len());
    mac_state.change_rit_mode(RitMode::Sender);

    let Some(now) = current_time(phy).await else {
        return true;
    };
    start_rit_tx_wait_period(now, mac_pib, mac_state);
    true
}

/// Keep the receiver on, listening for a beacon from the intended next hop,
/// and arm the TX wait timeout. A zero window is skipped.
fn start_rit_tx_wait_period(now: Instant, mac_pib: &mut MacPib, mac_state: &mut MacState<'_>) {
    debug_assert_eq!(mac_state.rit_mode, RitMode::Sender);

    debug!("beacon_wait start at {}", now);

    mac_pib.rx_on_when_idle = true;
    mac_state.change_engine_state(MacEngineState::Idle);

    let wait = mac_pib.rit_tx_wait_duration_time();
    if !wait.is_positive() {
        debug!("RIT tx wait duration is zero, window skipped");
        return;
    }

    mac_state.timers.rit_tx_wait = Some(now + wait);
}

pub(super) async fn sender_cycle_timeout(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'_>,
) {
    mac_state.timers.rit_tx_wait = None;

    if !(mac_pib.is_rit_enabled() && mac_state.rit_mode == RitMode::Sender) {
        debug!("TX wait timeout in mode {}, ignoring", mac_state.rit_mode);
        return;
    }

    debug!("beacon_wait timeout");
    end_sender_cycle(phy, mac_pib, mac_state).await;
}

async fn end_sender_cycle(phy: &mut impl Phy, mac_pib: &mut MacPib, mac_state: &mut MacState<'_>) {
    if mac_state.rit_mode != RitMode::Sender {
        warn!(
            "Sender cycle end requested in mode {}, ignoring",
            mac_state.rit_mode
        );
        return;
    }

    mac_state.timers.rit_tx_wait = None;
    mac_state.rit_sending = false;
    set_sleep(phy, mac_pib, mac_state).await;
}

/// Trigger the RIT data transmission after a matching beacon. Called in
/// response to the upper layer's verdict on MLME-RIT-REQ.indication.
pub(super) async fn send_rit_data<'a, Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    config: &mut MacConfig<Rng, Delay>,
) {
    if !(mac_pib.is_rit_enabled()
        && mac_state.rit_mode == RitMode::Sender
        && !mac_state.tx_queue.is_empty())
    {
        debug!("No RIT data transmission possible");
        return;
    }

    if mac_state.engine_state != MacEngineState::Idle {
        debug!("beacon_wait skip: MAC busy in {:?}", mac_state.engine_state);
        return;
    }

    debug!("beacon_wait end");
    mac_state.rit_sending = true;

    if mac_state.module_config.beacon_ack {
        do_send_rit_beacon_ack(phy, mac_pib, mac_state).await;
        return;
    }

    do_send_rit_data(phy, mac_pib, mac_state, config).await;
}

/// Transmit the queue head to the node whose RIT Data Request was received
/// last, rewriting the frame's destination accordingly.
pub(super) async fn do_send_rit_data<'a, Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    config: &mut MacConfig<Rng, Delay>,
) {
    let Some(requester) = mac_state.last_rx_rit_req_src else {
        warn!("No RIT request source recorded, cannot transmit");
        return;
    };

    loop {
        let Some(head) = mac_state.tx_queue.front_mut() else {
            warn!("Transmit queue empty in the sender cycle");
            return;
        };

        head.header.destination = Some(Address::Short(mac_pib.pan_id, requester));
        debug!(
            "RIT data transmission to {}, {} octet msdu",
            requester,
            head.msdu.len()
        );

        let ack_request = head.header.ack_request;
        let data = {
            let head = mac_state.tx_queue.front().expect("checked above");
            mac_state.serialize_frame(
                Frame {
                    header: head.header.clone(),
                    content: FrameContent::Data,
                    payload: &head.msdu,
                },
                footer_mode(mac_pib),
            )
        };

        if let Some(front_end) = mac_state.module_config.data_front_end() {
            mac_state.change_engine_state(MacEngineState::Csma);
            match perform_channel_access(phy, &mut mac_state.channel_access, front_end, config)
                .await
            {
                ChannelAccessOutcome::ChannelIdle => {}
                ChannelAccessOutcome::Failure => {
                    debug!("RIT data dropped, channel access failure");
                    mac_state.change_engine_state(MacEngineState::Idle);
                    let element = unwrap!(mac_state.tx_queue.pop_front());
                    let msdu_handle = element.msdu_handle;
                    element.responder.respond(DataConfirm {
                        msdu_handle,
                        status: Status::ChannelAccessFailure,
                    });
                    end_sender_cycle(phy, mac_pib, mac_state).await;
                    return;
                }
            }
        }

        mac_state.change_engine_state(MacEngineState::Sending);
        match phy
            .send(&data, None, SendContinuation::ReceiveContinuous)
            .await
        {
            Err(_) => {
                error!("RIT data transmission failed");
                mac_state.change_engine_state(MacEngineState::Idle);
                return;
            }
            Ok(_) => {
                if ack_request {
                    debug!("RIT data transmitted, waiting for ACK");
                    let Some(now) = current_time(phy).await else {
                        return;
                    };
                    mac_state.timers.ack_wait = Some(now + mac_pib.ack_wait_duration());
                    mac_state.change_engine_state(MacEngineState::AckPending);
                    return;
                }

                debug!("RIT data transmitted, no ACK required");
                mac_state.rit_sending = false;
                mac_state.change_engine_state(MacEngineState::Idle);

                let element = unwrap!(mac_state.tx_queue.pop_front());
                let msdu_handle = element.msdu_handle;
                element.responder.respond(DataConfirm {
                    msdu_handle,
                    status: Status::Success,
                });

                if mac_state.module_config.continuous_tx && !mac_state.tx_queue.is_empty() {
                    debug!("Continuous transmission, sending the next frame");
                    mac_state.rit_sending = true;
                    continue;
                }

                end_sender_cycle(phy, mac_pib, mac_state).await;
                return;
            }
        }
    }
}

/// Transmit a compact multipurpose Beacon-ACK to the requester. The data
/// frame follows after a short interframe spacing.
async fn do_send_rit_beacon_ack(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'_>,
) {
    debug_assert_eq!(mac_state.engine_state, MacEngineState::Idle);

    let Some(requester) = mac_state.last_rx_rit_req_src else {
        warn!("No RIT request source recorded, cannot send a Beacon-ACK");
        return;
    };

    let header = Header {
        frame_type: FrameType::Multipurpose,
        security_enabled: false,
        frame_pending: false,
        ack_request: false,
        pan_id_compress: true,
        version: FrameVersion::Ieee802154_2006,
        seq: mac_pib.dsn.next(),
        destination: Some(Address::Short(mac_pib.pan_id, requester)),
        source: None,
    };

    let data = mac_state.serialize_frame(
        Frame {
            header,
            content: FrameContent::Multipurpose,
            payload: &[],
        },
        footer_mode(mac_pib),
    );

    debug!("Beacon-ACK transmission to {}", requester);

    mac_state.change_engine_state(MacEngineState::Sending);
    match phy
        .send(&data, None, SendContinuation::ReceiveContinuous)
        .await
    {
        Ok(sent_at) => {
            mac_state.change_engine_state(MacEngineState::Idle);
            mac_state.timers.ifs = Some(sent_at + Duration::from_nanos(1));
        }
        Err(_) => {
            error!("Beacon-ACK transmission failed");
            mac_state.change_engine_state(MacEngineState::Idle);
        }
    }
}

pub(super) async fn ack_wait_timeout<'a, Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    config: &mut MacConfig<Rng, Delay>,
) {
    mac_state.timers.ack_wait = None;

    if mac_state.engine_state != MacEngineState::AckPending {
        debug!(
            "ACK wait timeout in state {:?}, ignoring",
            mac_state.engine_state
        );
        return;
    }

    mac_state.change_engine_state(MacEngineState::Idle);

    if !mac_pib.is_rit_enabled() {
        direct_tx_ack_timeout(phy, mac_pib, mac_state, config).await;
        return;
    }

    if mac_state.rit_mode != RitMode::Sender {
        error!("ACK wait timeout in mode {}", mac_state.rit_mode);
        return;
    }

    debug!("ACK wait timeout, ending the RIT sender cycle");
    mac_state.rit_sending = false;

    // Retry bookkeeping of the base timeout path. With the default of zero
    // frame retries the head is dropped with NO_ACK; with retries remaining
    // it stays queued for the next sender cycle.
    match mac_state.tx_queue.front_mut() {
        Some(head) if head.retries < mac_pib.max_frame_retries => {
            head.retries += 1;
            debug!("Retrying the frame in the next sender cycle");
        }
        Some(_) => {
            let element = unwrap!(mac_state.tx_queue.pop_front());
            let msdu_handle = element.msdu_handle;
            element.responder.respond(DataConfirm {
                msdu_handle,
                status: Status::NoAck,
            });
        }
        None => {}
    }

    end_sender_cycle(phy, mac_pib, mac_state).await;
}

pub(super) async fn ifs_wait_timeout<'a, Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    config: &mut MacConfig<Rng, Delay>,
) {
    mac_state.timers.ifs = None;

    match mac_state.rit_mode {
        RitMode::Sender => {
            if (mac_state.module_config.continuous_tx || mac_state.module_config.beacon_ack)
                && !mac_state.tx_queue.is_empty()
            {
                debug!("Interframe spacing over, sending the RIT data frame");
                do_send_rit_data(phy, mac_pib, mac_state, config).await;
            } else {
                end_sender_cycle(phy, mac_pib, mac_state).await;
            }
        }
        RitMode::Sleep => {
            check_tx_and_start_sender(phy, mac_pib, mac_state).await;
        }
        _ => {}
    }
}

/// Park the MAC. The radio is forced off unless the receiver is configured
/// to stay on, in which case the previous mode is kept so that incoming data
/// is still accepted.
async fn set_sleep(phy: &mut impl Phy, mac_pib: &mut MacPib, mac_state: &mut MacState<'_>) {
    debug_assert!(
        mac_state.timers.rit_data_wait.is_none() && mac_state.timers.rit_tx_wait.is_none()
    );

    mac_state.change_engine_state(MacEngineState::Idle);

    if mac_state.rx_always_on {
        debug!("Receiver stays on through sleep");
        return;
    }

    mac_state.change_rit_mode(RitMode::Sleep);
    mac_pib.rx_on_when_idle = false;
    if phy.stop_receive().await.is_err() {
        error!("Could not force the transceiver off");
    }
}

// ---------------------------------------------------------------------------
// Reception
// ---------------------------------------------------------------------------

/// Levels 1-3 of the reception filter. FCS validation happened during
/// deserialization; this applies the address filters.
fn accept_frame(header: &Header, mac_pib: &MacPib) -> bool {
    let mut accept = !matches!(header.frame_type, FrameType::Reserved(_));

    if accept {
        accept = header.version.is_supported();
    }

    let is_command = header.frame_type == FrameType::MacCommand;

    if accept {
        if let Some(destination) = &header.destination {
            let dst_pan = destination.pan_id();
            accept = dst_pan == mac_pib.pan_id
                || dst_pan.is_broadcast()
                || (mac_pib.pan_id.is_broadcast() && is_command);

            if accept {
                match destination {
                    Address::Short(_, short) => {
                        if *short == mac_pib.short_address {
                            // unicast, for us
                        } else if (short.is_broadcast() || short.is_multicast()) && is_command {
                            // broadcast or multicast command frames must not
                            // request an ACK
                            accept = !header.ack_request;
                        } else {
                            accept = false;
                        }
                    }
                    Address::Extended(_, extended) => {
                        accept = *extended == mac_pib.extended_address;
                    }
                }
            }
        }
    }

    accept
}

pub(super) async fn process_message<'a, Rng: RngCore, Delay: DelayNsExt>(
    message: ReceivedMessage,
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    handler: &MacHandler<'a>,
    config: &mut MacConfig<Rng, Delay>,
) {
    let Some(frame) = mac_state.deserialize_frame(&message.data, footer_mode(mac_pib)) else {
        debug!("MacRxDrop: frame failed the FCS check or did not parse");
        return;
    };

    if mac_pib.promiscuous_mode {
        trace!("Promiscuous frame of {} octets", message.data.len());
        return;
    }

    if !accept_frame(&frame.header, mac_pib) {
        debug!("MacRxDrop: frame rejected by the address filter");
        return;
    }

    match frame.content {
        FrameContent::Command(command) => {
            receive_command(command, &frame, &message, phy, mac_pib, mac_state, handler, config)
                .await
        }
        FrameContent::Data => {
            receive_data(&frame, &message, phy, mac_pib, mac_state, handler).await
        }
        FrameContent::Multipurpose => {
            if !mac_state.module_config.beacon_ack {
                debug!("Multipurpose frame without Beacon-ACK enabled, ignoring");
            } else if mac_state.rit_mode == RitMode::Receiver {
                debug!("Multipurpose frame received, extending the data wait");
                if let Some(now) = current_time(phy).await {
                    mac_state.timers.rit_data_wait = Some(now + mac_state.continuous_tx_timeout);
                }
            }
        }
        FrameContent::Acknowledgement => {
            receive_ack(&frame, phy, mac_pib, mac_state, config).await
        }
        FrameContent::Beacon | FrameContent::Reserved => {
            trace!("Ignoring a frame of type {:?}", frame.header.frame_type);
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn receive_command<'a, Rng: RngCore, Delay: DelayNsExt>(
    command: Command,
    frame: &Frame<'_>,
    message: &ReceivedMessage,
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    handler: &MacHandler<'a>,
    config: &mut MacConfig<Rng, Delay>,
) {
    match command {
        Command::RitDataRequest => match mac_state.rit_mode {
            RitMode::Sender => {
                if mac_state.rit_sending {
                    debug!("RIT request received while already sending, ignored");
                    return;
                }

                mac_state.timers.rit_tx_wait = None;

                let Some(requester) = frame.header.source.as_ref().and_then(|s| s.short()) else {
                    debug!("RIT request without a short source address, ignored");
                    return;
                };
                mac_state.last_rx_rit_req_src = Some(requester);

                let mut rit_request_payload = RitRequestPayload::new();
                let take = frame.payload.len().min(rit_request_payload.capacity());
                unwrap!(rit_request_payload.extend_from_slice(&frame.payload[..take]));

                let (src_addr_mode, src_pan_id, src_addr, src_ext_addr) =
                    addressing(&frame.header.source);
                let (dst_addr_mode, dst_pan_id, dst_addr, dst_ext_addr) =
                    addressing(&frame.header.destination);

                let response = handler
                    .indicate(RitRequestIndication {
                        src_addr_mode,
                        src_pan_id,
                        src_addr,
                        src_ext_addr,
                        dst_addr_mode,
                        dst_pan_id,
                        dst_addr,
                        dst_ext_addr,
                        rit_request_payload,
                        link_quality: message.lqi,
                        dsn: frame.header.seq,
                        timestamp: message.timestamp.symbols() as u32,
                    })
                    .await;

                if response.transmit {
                    send_rit_data(phy, mac_pib, mac_state, config).await;
                }
            }
            RitMode::Receiver => {
                debug!("RIT request received in receiver mode, not handled");
            }
            RitMode::Bootstrap => {}
            mode => {
                debug!("RIT request received in mode {}, ignored", mode);
            }
        },
        Command::RitDataResponse => {
            debug!("RIT Data Response received, not handled");
        }
        Command::Other(id) => {
            trace!("Ignoring command {}", id);
        }
    }
}

async fn receive_data<'a>(
    frame: &Frame<'_>,
    message: &ReceivedMessage,
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    handler: &MacHandler<'a>,
) {
    match mac_state.rit_mode {
        RitMode::Receiver | RitMode::Disabled => {}
        RitMode::Sender => {
            warn!("Data received in sender mode, ignoring");
            return;
        }
        mode => {
            debug!("Data received in mode {}, ignoring", mode);
            return;
        }
    }

    let (src_addr_mode, src_pan_id, src_addr, src_ext_addr) = addressing(&frame.header.source);
    let (dst_addr_mode, dst_pan_id, dst_addr, dst_ext_addr) = addressing(&frame.header.destination);

    let mut msdu = MacPayload::new();
    unwrap!(msdu.extend_from_slice(frame.payload));

    debug!(
        "Data frame for this node from {}, {} octets",
        src_addr,
        msdu.len()
    );

    handler
        .indicate(DataIndication {
            src_addr_mode,
            src_pan_id,
            src_addr,
            src_ext_addr,
            dst_addr_mode,
            dst_pan_id,
            dst_addr,
            dst_ext_addr,
            mpdu_link_quality: message.lqi,
            dsn: frame.header.seq,
            msdu,
        })
        .await;

    if frame.header.ack_request {
        // The ACK takes priority over any channel access in progress
        mac_state.channel_access.cancel();
        mac_state.change_engine_state(MacEngineState::Idle);

        if mac_state.rit_mode == RitMode::Receiver {
            // Keep the receiver open for a fresh full window while the ACK
            // is outstanding
            if let Some(now) = current_time(phy).await {
                mac_state.timers.rit_data_wait =
                    Some(now + mac_pib.rit_data_wait_duration_time());
            }
        }

        send_ack(phy, mac_pib, mac_state, frame.header.seq, message.timestamp).await;

        if mac_state.rit_mode == RitMode::Receiver {
            if mac_state.module_config.continuous_tx && mac_state.continuous_rx {
                if let Some(now) = current_time(phy).await {
                    mac_state.timers.rit_data_wait =
                        Some(now + mac_state.continuous_tx_timeout);
                }
            } else {
                end_receiver_cycle(phy, mac_pib, mac_state).await;
            }
        }
    } else if mac_state.rit_mode == RitMode::Receiver {
        end_receiver_cycle(phy, mac_pib, mac_state).await;
    }
}

async fn receive_ack<'a, Rng: RngCore, Delay: DelayNsExt>(
    frame: &Frame<'_>,
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    config: &mut MacConfig<Rng, Delay>,
) {
    if mac_state.engine_state != MacEngineState::AckPending {
        trace!("Unexpected ACK, ignoring");
        return;
    }

    let Some(expected_seq) = mac_state.tx_queue.front().map(|e| e.header.seq) else {
        return;
    };

    if frame.header.seq != expected_seq {
        debug!(
            "ACK sequence mismatch: {} expected {}",
            frame.header.seq, expected_seq
        );
        return;
    }

    debug!("Ack received");
    mac_state.rit_sending = false;
    mac_state.timers.ack_wait = None;
    mac_state.change_engine_state(MacEngineState::Idle);

    let element = unwrap!(mac_state.tx_queue.pop_front());
    let msdu_handle = element.msdu_handle;
    element.responder.respond(DataConfirm {
        msdu_handle,
        status: Status::Success,
    });

    match mac_state.rit_mode {
        RitMode::Sender => end_sender_cycle(phy, mac_pib, mac_state).await,
        RitMode::Disabled => check_direct_tx(phy, mac_pib, mac_state, config).await,
        _ => {}
    }
}

/// Transmit an acknowledgment one SIFS after the acknowledged frame arrived.
async fn send_ack(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'_>,
    seq: u8,
    receive_time: Instant,
) {
    let data = mac_state.serialize_frame(
        Frame {
            header: Header {
                frame_type: FrameType::Acknowledgement,
                security_enabled: false,
                frame_pending: false,
                ack_request: false,
                pan_id_compress: false,
                version: FrameVersion::Ieee802154_2003,
                seq,
                destination: None,
                source: None,
            },
            content: FrameContent::Acknowledgement,
            payload: &[],
        },
        footer_mode(mac_pib),
    );

    trace!("Sending ack");
    mac_state.change_engine_state(MacEngineState::Sending);
    match phy
        .send(
            &data,
            Some(receive_time + mac_pib.sifs_time()),
            SendContinuation::ReceiveContinuous,
        )
        .await
    {
        Ok(_) => {}
        Err(_) => error!("Could not send an ack"),
    }
    mac_state.change_engine_state(MacEngineState::Idle);
}

// ---------------------------------------------------------------------------
// Channel access and the direct (RIT-disabled) transmit path
// ---------------------------------------------------------------------------

/// Drive the selected front-end through its CCA sequence against the PHY.
async fn perform_channel_access<Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    chain: &mut ChannelAccessChain,
    front_end: FrontEnd,
    config: &mut MacConfig<Rng, Delay>,
) -> ChannelAccessOutcome {
    let mut delay = config.delay.clone();
    let mut plan = chain.start(front_end, &mut config.rng);

    loop {
        if let Some(backoff) = plan.backoff {
            delay.delay_duration(backoff).await;
        }

        let status = match phy.cca().await {
            Ok(status) => status,
            Err(_) => {
                error!("CCA request failed");
                chain.cancel();
                return ChannelAccessOutcome::Failure;
            }
        };

        match chain.cca_confirm(status, &mut config.rng) {
            CcaVerdict::ChannelIdle => return ChannelAccessOutcome::ChannelIdle,
            CcaVerdict::ChannelAccessFailure => return ChannelAccessOutcome::Failure,
            CcaVerdict::Retry(next) => plan = next,
            CcaVerdict::Fallthrough => {
                warn!("CCA confirm reached no active front-end");
                return ChannelAccessOutcome::Failure;
            }
        }
    }
}

/// The transmission path when RIT is disabled: queued frames go out
/// immediately through unslotted CSMA-CA.
pub(super) async fn check_direct_tx<'a, Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    config: &mut MacConfig<Rng, Delay>,
) {
    if mac_pib.is_rit_enabled() || mac_state.engine_state != MacEngineState::Idle {
        return;
    }

    loop {
        let Some(front) = mac_state.tx_queue.front() else {
            return;
        };

        let ack_request = front.header.ack_request;
        let data = mac_state.serialize_frame(
            Frame {
                header: front.header.clone(),
                content: FrameContent::Data,
                payload: &front.msdu,
            },
            footer_mode(mac_pib),
        );

        mac_state.change_engine_state(MacEngineState::Csma);
        match perform_channel_access(phy, &mut mac_state.channel_access, FrontEnd::CsmaCa, config)
            .await
        {
            ChannelAccessOutcome::ChannelIdle => {}
            ChannelAccessOutcome::Failure => {
                debug!("Direct transmission dropped, channel access failure");
                mac_state.change_engine_state(MacEngineState::Idle);
                let element = unwrap!(mac_state.tx_queue.pop_front());
                let msdu_handle = element.msdu_handle;
                element.responder.respond(DataConfirm {
                    msdu_handle,
                    status: Status::ChannelAccessFailure,
                });
                continue;
            }
        }

        mac_state.change_engine_state(MacEngineState::Sending);
        match phy
            .send(&data, None, SendContinuation::ReceiveContinuous)
            .await
        {
            Err(_) => {
                error!("Direct transmission failed");
                mac_state.change_engine_state(MacEngineState::Idle);
                let element = unwrap!(mac_state.tx_queue.pop_front());
                let msdu_handle = element.msdu_handle;
                element.responder.respond(DataConfirm {
                    msdu_handle,
                    status: Status::PhyError,
                });
            }
            Ok(_) => {
                if ack_request {
                    mac_state.change_engine_state(MacEngineState::AckPending);
                    let Some(now) = current_time(phy).await else {
                        return;
                    };
                    mac_state.timers.ack_wait = Some(now + mac_pib.ack_wait_duration());
                    return;
                }

                mac_state.change_engine_state(MacEngineState::Idle);
                let element = unwrap!(mac_state.tx_queue.pop_front());
                let msdu_handle = element.msdu_handle;
                element.responder.respond(DataConfirm {
                    msdu_handle,
                    status: Status::Success,
                });
            }
        }
    }
}

/// Retry bookkeeping for an ACK timeout on the direct transmit path.
async fn direct_tx_ack_timeout<'a, Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    config: &mut MacConfig<Rng, Delay>,
) {
    let retransmit = match mac_state.tx_queue.front_mut() {
        Some(head) if head.retries < mac_pib.max_frame_retries => {
            head.retries += 1;
            true
        }
        Some(_) => false,
        None => return,
    };

    if !retransmit {
        debug!("No ACK after the final attempt, dropping the frame");
        let element = unwrap!(mac_state.tx_queue.pop_front());
        let msdu_handle = element.msdu_handle;
        element.responder.respond(DataConfirm {
            msdu_handle,
            status: Status::NoAck,
        });
    }

    check_direct_tx(phy, mac_pib, mac_state, config).await;
}
