use core::fmt::Display;

use heapless::Deque;

use crate::{
    drift::{ClockDriftApplier, TimeDriftApplier},
    sap::data::{DataRequest, MacPayload},
    time::{Duration, Instant},
    wire::{self, FooterMode, ShortAddress},
};

use super::{commander::RequestResponder, ChannelAccessChain, ModuleConfig};

pub const TX_QUEUE_CAPACITY: usize = 8;

/// The RIT operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum RitMode {
    Disabled,
    Sender,
    Receiver,
    Sleep,
    Bootstrap,
}

impl Display for RitMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            RitMode::Disabled => "DISABLED",
            RitMode::Sender => "SENDER",
            RitMode::Receiver => "RECEIVER",
            RitMode::Sleep => "SLEEP",
            RitMode::Bootstrap => "BOOTSTRAP",
        };
        write!(f, "{name}")
    }
}

/// The base transmission machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum MacEngineState {
    Idle,
    Csma,
    Sending,
    AckPending,
}

/// A frame waiting in the transmit queue. The confirm responder is answered
/// when the transmission reaches a terminal outcome.
pub struct TxQueueElement<'a> {
    pub msdu_handle: u8,
    pub header: wire::Header,
    pub msdu: MacPayload,
    pub retries: u8,
    pub responder: RequestResponder<'a, DataRequest>,
}

/// One deadline slot per named timer. Arming a slot replaces any prior
/// instance; clearing is idempotent.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerSlots {
    pub periodic_rit_data_request: Option<Instant>,
    pub rit_data_wait: Option<Instant>,
    pub rit_tx_wait: Option<Instant>,
    pub ack_wait: Option<Instant>,
    pub ifs: Option<Instant>,
}

pub struct MacState<'a> {
    pub rit_mode: RitMode,
    pub engine_state: MacEngineState,
    pub tx_queue: Deque<TxQueueElement<'a>, TX_QUEUE_CAPACITY>,
    pub timers: TimerSlots,
    /// Guards the sender cycle against a second trigger while a data
    /// transmission is already in progress.
    pub rit_sending: bool,
    /// Continuous reception handshake state (multipurpose Beacon-ACK flow).
    pub continuous_rx: bool,
    /// Keep the receiver powered during sleep.
    pub rx_always_on: bool,
    pub last_rx_rit_req_src: Option<ShortAddress>,
    pub module_config: ModuleConfig,
    pub channel_access: ChannelAccessChain,
    pub clock_drift: Option<ClockDriftApplier>,
    pub time_drift: Option<TimeDriftApplier>,
    /// Extension of the receive window while a continuous exchange runs.
    pub continuous_tx_timeout: Duration,
}

impl MacState<'_> {
    pub fn new() -> Self {
        Self {
            rit_mode: RitMode::Disabled,
            engine_state: MacEngineState::Idle,
            tx_queue: Deque::new(),
            timers: TimerSlots::default(),
            rit_sending: false,
            continuous_rx: false,
            rx_always_on: false,
            last_rx_rit_req_src: None,
            module_config: ModuleConfig::default(),
            channel_access: ChannelAccessChain::new(),
            clock_drift: None,
            time_drift: None,
            continuous_tx_timeout: Duration::from_millis(10),
        }
    }

    pub fn change_rit_mode(&mut self, new_mode: RitMode) {
        if self.rit_mode == new_mode {
            return;
        }

        debug!("RIT MAC mode {} -> {}", self.rit_mode, new_mode);
        self.rit_mode = new_mode;
    }

    pub fn change_engine_state(&mut self, new_state: MacEngineState) {
        if self.engine_state == new_state {
            return;
        }

        trace!("MAC state {:?} -> {:?}", self.engine_state, new_state);
        self.engine_state = new_state;
    }

    /// Whether the receiver should be powered while the engine waits.
    pub fn rx_should_be_on(&self, rx_on_when_idle: bool) -> bool {
        rx_on_when_idle || self.rx_always_on
    }

    pub fn serialize_frame(
        &self,
        frame: wire::Frame<'_>,
        footer_mode: FooterMode,
    ) -> heapless::Vec<u8, { crate::consts::MAX_PHY_PACKET_SIZE }> {
        use byte::TryWrite;

        let mut buffer = heapless::Vec::new();
        unwrap!(buffer.resize_default(crate::consts::MAX_PHY_PACKET_SIZE));
        let length = frame
            .try_write(&mut buffer, footer_mode)
            .expect("outgoing frames are validated against the PHY packet size");
        buffer.truncate(length);

        buffer
    }

    pub fn deserialize_frame<'data>(
        &self,
        data: &'data [u8],
        footer_mode: FooterMode,
    ) -> Option<wire::Frame<'data>> {
        use byte::TryRead;

        match wire::Frame::try_read(data, footer_mode) {
            Ok((frame, _)) => Some(frame),
            Err(e) => {
                trace!("Could not deserialize a frame: {:?}", e);
                None
            }
        }
    }
}

impl Default for MacState<'_> {
    fn default() -> Self {
        Self::new()
    }
}
