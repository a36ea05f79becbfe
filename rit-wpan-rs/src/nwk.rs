//! The rank forwarding layer: minimal multi-hop plumbing rooted at a node
//! with rank 0.
//!
//! Forwarding decisions are made solely from statically assigned ranks,
//! assuming a tree topology rooted at the designated parent. There is no
//! route discovery or maintenance; the layer exists to enable multi-hop
//! evaluation without masking MAC-layer effects.

use core::{
    pin::pin,
    sync::atomic::{AtomicU32, Ordering},
};

use byte::{TryRead, TryWrite};
use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use heapless::Deque;
use rand::Rng as _;
use rand_core::RngCore;

use crate::{
    mac::{IndicationResponder, MacCommander},
    pib::{PibValue, RitRequestPayload},
    sap::{
        data::{DataIndication, DataRequest, MacPayload, TxOptions},
        rit::{RitRequestIndication, RitRequestResponse},
        set::SetRequest,
        IndicationValue, Status,
    },
    time::{DelayNsExt, Duration},
    wire::{nwk::RitNwkHeader, AddressingMode, ExtendedAddress, PanId, ShortAddress},
};

const PENDING_CAPACITY: usize = 8;

/// Configuration of one forwarding layer instance.
#[derive(Debug, Clone)]
pub struct NwkConfig<Rng: RngCore, Delay: DelayNsExt> {
    /// Tree depth from the root; uplink frames flow toward smaller ranks.
    pub rank: u16,
    pub short_addr: ShortAddress,
    pub pan_id: PanId,
    /// Retransmissions after NO_ACK before the frame is dropped.
    pub max_retries: u8,
    /// Upper bound of the randomized retransmission delay.
    pub retry_delay_max: Duration,
    pub rng: Rng,
    pub delay: Delay,
}

/// Event counters mirrored from the trace surface, readable at any time.
#[derive(Debug)]
pub struct NwkCounters {
    tx: AtomicU32,
    tx_ok: AtomicU32,
    tx_drop: AtomicU32,
    rx: AtomicU32,
    rx_drop: AtomicU32,
    retx: AtomicU32,
}

impl NwkCounters {
    const fn new() -> Self {
        Self {
            tx: AtomicU32::new(0),
            tx_ok: AtomicU32::new(0),
            tx_drop: AtomicU32::new(0),
            rx: AtomicU32::new(0),
            rx_drop: AtomicU32::new(0),
            retx: AtomicU32::new(0),
        }
    }

    pub fn tx(&self) -> u32 {
        self.tx.load(Ordering::Relaxed)
    }

    pub fn tx_ok(&self) -> u32 {
        self.tx_ok.load(Ordering::Relaxed)
    }

    pub fn tx_drop(&self) -> u32 {
        self.tx_drop.load(Ordering::Relaxed)
    }

    pub fn rx(&self) -> u32 {
        self.rx.load(Ordering::Relaxed)
    }

    pub fn rx_drop(&self) -> u32 {
        self.rx_drop.load(Ordering::Relaxed)
    }

    pub fn retx(&self) -> u32 {
        self.retx.load(Ordering::Relaxed)
    }

    fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A packet delivered to the layer above.
#[derive(Debug, Clone)]
pub struct NwkReceived {
    pub payload: MacPayload,
    pub src: ShortAddress,
}

/// The rendezvous object between the forwarding task and the device surface.
pub struct NwkHandle {
    pub(crate) outbound: Channel<CriticalSectionRawMutex, (MacPayload, ShortAddress), 4>,
    pub(crate) inbound: Channel<CriticalSectionRawMutex, NwkReceived, 8>,
    counters: NwkCounters,
}

impl NwkHandle {
    pub const fn new() -> Self {
        Self {
            outbound: Channel::new(),
            inbound: Channel::new(),
            counters: NwkCounters::new(),
        }
    }

    pub fn counters(&self) -> &NwkCounters {
        &self.counters
    }
}

impl Default for NwkHandle {
    fn default() -> Self {
        Self::new()
    }
}

struct Outbound {
    /// The payload without the rank header; the header is rebuilt for every
    /// transmission attempt.
    payload: MacPayload,
    dst: ShortAddress,
    nwk_handle: u8,
    retries: u8,
}

struct NwkState {
    pending: Deque<Outbound, PENDING_CAPACITY>,
    next_nwk_handle: u8,
    next_msdu_handle: u8,
}

impl NwkState {
    fn alloc_nwk_handle(&mut self) -> u8 {
        let handle = self.next_nwk_handle;
        self.next_nwk_handle = self.next_nwk_handle.wrapping_add(1);
        handle
    }

    fn alloc_msdu_handle(&mut self) -> u8 {
        let handle = self.next_msdu_handle;
        self.next_msdu_handle = self.next_msdu_handle.wrapping_add(1);
        handle
    }
}

/// Run the forwarding layer on top of a MAC.
///
/// This is an async function that should always be polled in the background,
/// next to the MAC engine it drives.
pub async fn run_nwk<'a, Rng: RngCore, Delay: DelayNsExt>(
    commander: &'a MacCommander,
    handle: &'a NwkHandle,
    mut config: NwkConfig<Rng, Delay>,
) -> ! {
    let mut state = NwkState {
        pending: Deque::new(),
        next_nwk_handle: 0,
        next_msdu_handle: 0,
    };

    advertise_rank(commander, &config).await;

    loop {
        if let Some(outbound) = state.pending.pop_front() {
            transmit(commander, handle, &mut state, &mut config, outbound).await;
            continue;
        }

        match select(handle.outbound.receive(), commander.wait_for_indication()).await {
            Either::First((payload, dst)) => {
                let nwk_handle = state.alloc_nwk_handle();
                let outbound = Outbound {
                    payload,
                    dst,
                    nwk_handle,
                    retries: 0,
                };
                if state.pending.push_back(outbound).is_err() {
                    warn!("Send queue full, dropping packet");
                    NwkCounters::bump(&handle.counters.tx_drop);
                }
            }
            Either::Second(responder) => handle_indication(responder, handle, &mut state, &config),
        }
    }
}

/// Push the node's rank into the beacon payload, so every RIT Data Request
/// this MAC transmits advertises it.
async fn advertise_rank<Rng: RngCore, Delay: DelayNsExt>(
    commander: &MacCommander,
    config: &NwkConfig<Rng, Delay>,
) {
    let header = RitNwkHeader {
        rank: config.rank,
        src: ShortAddress(0),
        dst: ShortAddress::BROADCAST,
    };

    let mut bytes = [0u8; RitNwkHeader::SERIALIZED_SIZE];
    unwrap!(header.try_write(&mut bytes, ()));

    let mut payload = RitRequestPayload::new();
    unwrap!(payload.extend_from_slice(&bytes));

    let confirm = commander
        .request(SetRequest {
            pib_attribute: PibValue::MAC_RIT_REQUEST_PAYLOAD,
            pib_attribute_value: PibValue::MacRitRequestPayload(payload),
        })
        .await;

    if confirm.status != Status::Success {
        error!("Could not advertise the rank in the beacon payload");
    }
}

/// Send one packet, retrying with a randomized delay on NO_ACK. Indications
/// arriving while the transaction runs are serviced throughout, so the MAC
/// never stalls on an unanswered indication.
async fn transmit<'a, Rng: RngCore, Delay: DelayNsExt>(
    commander: &'a MacCommander,
    handle: &'a NwkHandle,
    state: &mut NwkState,
    config: &mut NwkConfig<Rng, Delay>,
    mut outbound: Outbound,
) {
    loop {
        NwkCounters::bump(&handle.counters.tx);

        let header = RitNwkHeader {
            rank: config.rank,
            src: config.short_addr,
            dst: outbound.dst,
        };
        let mut header_bytes = [0u8; RitNwkHeader::SERIALIZED_SIZE];
        unwrap!(header.try_write(&mut header_bytes, ()));

        let mut msdu = MacPayload::new();
        if msdu.extend_from_slice(&header_bytes).is_err()
            || msdu.extend_from_slice(&outbound.payload).is_err()
        {
            error!("NwkTxDrop: payload does not fit a frame");
            NwkCounters::bump(&handle.counters.tx_drop);
            return;
        }

        let msdu_handle = state.alloc_msdu_handle();
        debug!(
            "NwkTx handle {} ({} octets) to {}",
            outbound.nwk_handle,
            msdu.len(),
            outbound.dst
        );

        let request = DataRequest {
            src_addr_mode: AddressingMode::Short,
            dst_addr_mode: AddressingMode::Short,
            dst_pan_id: config.pan_id,
            dst_addr: outbound.dst,
            dst_ext_addr: ExtendedAddress::BROADCAST,
            msdu_handle,
            tx_options: TxOptions::acknowledged(),
            msdu,
        };

        let confirm = {
            let mut request_future = pin!(commander.request(request));
            loop {
                match select(&mut request_future, commander.wait_for_indication()).await {
                    Either::First(confirm) => break confirm,
                    Either::Second(responder) => {
                        handle_indication(responder, handle, state, config)
                    }
                }
            }
        };

        match confirm.status {
            Status::Success => {
                debug!("NwkTxOk handle {}", outbound.nwk_handle);
                NwkCounters::bump(&handle.counters.tx_ok);
                return;
            }
            Status::NoAck if outbound.retries < config.max_retries => {
                outbound.retries += 1;
                NwkCounters::bump(&handle.counters.retx);
                debug!(
                    "NwkReTx handle {} ({}/{})",
                    outbound.nwk_handle, outbound.retries, config.max_retries
                );

                let settle =
                    Duration::from_ticks(config.rng.gen_range(0..=config.retry_delay_max.ticks()));
                let mut retry_delay = config.delay.clone();
                let mut delay_future = pin!(retry_delay.delay_duration(settle));
                loop {
                    match select(&mut delay_future, commander.wait_for_indication()).await {
                        Either::First(()) => break,
                        Either::Second(responder) => {
                            handle_indication(responder, handle, state, config)
                        }
                    }
                }
            }
            status => {
                debug!(
                    "NwkTxDrop handle {} with status {:?}",
                    outbound.nwk_handle, status
                );
                NwkCounters::bump(&handle.counters.tx_drop);
                return;
            }
        }
    }
}

fn handle_indication<Rng: RngCore, Delay: DelayNsExt>(
    responder: IndicationResponder<'_, IndicationValue>,
    handle: &NwkHandle,
    state: &mut NwkState,
    config: &NwkConfig<Rng, Delay>,
) {
    match &responder.indication {
        IndicationValue::Data(_) => {
            let responder = responder.into_concrete::<DataIndication>();
            process_data_indication(&responder.indication, handle, state, config);
            responder.respond(());
        }
        IndicationValue::RitRequest(_) => {
            let responder = responder.into_concrete::<RitRequestIndication>();
            let transmit = rit_request_matches(&responder.indication, config);
            responder.respond(RitRequestResponse { transmit });
        }
    }
}

/// A received beacon triggers transmission when it was sent by this node's
/// next hop, i.e. the advertised rank is exactly one below ours.
fn rit_request_matches<Rng: RngCore, Delay: DelayNsExt>(
    indication: &RitRequestIndication,
    config: &NwkConfig<Rng, Delay>,
) -> bool {
    match RitNwkHeader::try_read(&indication.rit_request_payload, ()) {
        Ok((header, _)) => {
            if header.rank.wrapping_add(1) == config.rank {
                debug!("Answering the RIT request from rank {}", header.rank);
                true
            } else {
                debug!(
                    "RIT request from rank {} ignored, mine is {}",
                    header.rank, config.rank
                );
                false
            }
        }
        Err(_) => {
            debug!("RIT request payload carries no rank header");
            false
        }
    }
}

fn process_data_indication<Rng: RngCore, Delay: DelayNsExt>(
    indication: &DataIndication,
    handle: &NwkHandle,
    state: &mut NwkState,
    config: &NwkConfig<Rng, Delay>,
) {
    let Ok((nwk_header, header_len)) = RitNwkHeader::try_read(&indication.msdu, ()) else {
        debug!("NwkRxDrop: frame without a rank header");
        NwkCounters::bump(&handle.counters.rx_drop);
        return;
    };
    let payload = &indication.msdu[header_len..];

    if nwk_header.dst == config.short_addr {
        debug!(
            "NwkRx: {} octets from {} for this node",
            payload.len(),
            nwk_header.src
        );
        NwkCounters::bump(&handle.counters.rx);

        let mut delivered = MacPayload::new();
        unwrap!(delivered.extend_from_slice(payload));
        let received = NwkReceived {
            payload: delivered,
            src: nwk_header.src,
        };
        if handle.inbound.try_send(received).is_err() {
            warn!("Inbound queue full, delivery dropped");
        }
        return;
    }

    if nwk_header.rank > config.rank {
        debug!(
            "NwkRx: forwarding toward {}, frame rank {} above mine {}",
            nwk_header.dst, nwk_header.rank, config.rank
        );
        NwkCounters::bump(&handle.counters.rx);

        let mut forwarded = MacPayload::new();
        unwrap!(forwarded.extend_from_slice(payload));
        let outbound = Outbound {
            payload: forwarded,
            dst: nwk_header.dst,
            nwk_handle: state.alloc_nwk_handle(),
            retries: 0,
        };
        if state.pending.push_back(outbound).is_err() {
            warn!("Forwarding queue full, dropping packet");
            NwkCounters::bump(&handle.counters.tx_drop);
        }
        return;
    }

    debug!("NwkRxDrop: not forwarded by the rank rule");
    NwkCounters::bump(&handle.counters.rx_drop);
}
