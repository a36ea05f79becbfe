//! The RIT MAC engine.
//!
//! The engine is an async function that must be polled in the background. It
//! multiplexes radio events, its own timer deadlines and upper-layer
//! requests arriving through the [MacCommander].

use core::fmt::Display;

use embassy_futures::select::{select, Either};
use futures::FutureExt;
use rand_core::RngCore;

use crate::{
    phy::Phy,
    pib::MacPib,
    sap::{
        rit::{RitModuleConfigConfirm, RitModuleConfigRequest},
        RequestValue, Status,
    },
    time::{DelayNsExt, Instant},
    wire::ExtendedAddress,
};

mod channel_access;
mod commander;
mod mcps_data;
mod mlme_get;
mod mlme_reset;
mod mlme_set;
mod rit;
mod state;

pub use channel_access::{
    ChannelAccess, ChannelAccessChain, CsmaCa, FrontEnd, PreCs, PreCsB, MAC_MAX_CSMA_BACKOFFS,
    MAC_MAX_BE, MAC_MIN_BE,
};
pub use commander::{IndicationResponder, MacCommander};
use commander::{MacHandler, RequestResponder};
pub use state::{MacEngineState, MacState, RitMode, TxQueueElement, TX_QUEUE_CAPACITY};

/// Configuration for the MAC layer.
#[derive(Debug, Clone)]
pub struct MacConfig<Rng: RngCore, Delay: DelayNsExt> {
    /// The unique EUI-64 address used by the mac layer.
    pub extended_address: ExtendedAddress,
    /// Distinguishes parallel scenario runs in the drift RNG streams.
    pub run_id: u32,
    /// Extension of the receive window between frames of a continuous
    /// exchange.
    pub continuous_tx_timeout: crate::time::Duration,
    pub rng: Rng,
    pub delay: Delay,
}

/// The optional MAC mechanisms, chosen at install time.
///
/// Within each of the data and beacon families at most one carrier-sense
/// front-end may be enabled; [ModuleConfig::validate] rejects a violation
/// before anything runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ModuleConfig {
    pub data_csma: bool,
    pub data_precs: bool,
    pub data_precsb: bool,
    pub beacon_csma: bool,
    pub beacon_precs: bool,
    pub beacon_precsb: bool,
    pub continuous_tx: bool,
    pub beacon_randomize: bool,
    pub compact_rit_data_request: bool,
    pub beacon_ack: bool,
}

impl ModuleConfig {
    pub fn validate(&self) -> Result<(), ModuleConfigError> {
        let data_modes = self.data_csma as u8 + self.data_precs as u8 + self.data_precsb as u8;
        if data_modes > 1 {
            return Err(ModuleConfigError::DataChannelAccessConflict);
        }

        let beacon_modes =
            self.beacon_csma as u8 + self.beacon_precs as u8 + self.beacon_precsb as u8;
        if beacon_modes > 1 {
            return Err(ModuleConfigError::BeaconChannelAccessConflict);
        }

        Ok(())
    }

    /// The front-end data frames are routed through, if any.
    pub fn data_front_end(&self) -> Option<FrontEnd> {
        if self.data_csma {
            Some(FrontEnd::CsmaCa)
        } else if self.data_precs {
            Some(FrontEnd::PreCs)
        } else if self.data_precsb {
            Some(FrontEnd::PreCsB)
        } else {
            None
        }
    }

    /// The front-end RIT Data Request frames are routed through, if any.
    pub fn beacon_front_end(&self) -> Option<FrontEnd> {
        if self.beacon_csma {
            Some(FrontEnd::CsmaCa)
        } else if self.beacon_precs {
            Some(FrontEnd::PreCs)
        } else if self.beacon_precsb {
            Some(FrontEnd::PreCsB)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ModuleConfigError {
    /// More than one of the data-frame carrier-sense options is enabled.
    DataChannelAccessConflict,
    /// More than one of the beacon-frame carrier-sense options is enabled.
    BeaconChannelAccessConflict,
}

impl Display for ModuleConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ModuleConfigError::DataChannelAccessConflict => write!(
                f,
                "only one of data_csma, data_precs or data_precsb may be enabled"
            ),
            ModuleConfigError::BeaconChannelAccessConflict => write!(
                f,
                "only one of beacon_csma, beacon_precs or beacon_precsb may be enabled"
            ),
        }
    }
}

impl core::error::Error for ModuleConfigError {}

/// Run the MAC layer.
///
/// This is an async function that should always be polled in the background.
/// The given [MacCommander] is the method of communicating with the MAC.
pub async fn run_mac_engine<'a, Rng: RngCore, Delay: DelayNsExt>(
    mut phy: impl Phy + 'a,
    commander: &'a MacCommander,
    mut config: MacConfig<Rng, Delay>,
) -> ! {
    let handler = commander.get_handler();
    let mut mac_pib = MacPib::new(config.extended_address);
    let mut mac_state = MacState::new();
    mac_state.continuous_tx_timeout = config.continuous_tx_timeout;

    loop {
        let result = select(
            wait_for_radio_event(&mut phy, &mac_pib, &mac_state, &mut config.delay),
            handler.wait_for_request(),
        )
        .await;

        match result {
            Either::First(event) => {
                handle_radio_event(
                    event,
                    &mut phy,
                    &mut mac_pib,
                    &mut mac_state,
                    &handler,
                    &mut config,
                )
                .await
            }
            Either::Second(responder) => {
                handle_request(
                    responder,
                    &mut phy,
                    &mut mac_pib,
                    &mut mac_state,
                    &mut config,
                )
                .await;
            }
        }
    }
}

enum RadioEvent<P: Phy> {
    Error,
    PhyWaitDone { context: P::ProcessingContext },
    PeriodicRitDataRequest,
    RitDataWaitTimeout,
    RitTxWaitTimeout,
    AckWaitTimeout,
    IfsTimeout,
}

/// Wait for a radio event. The event must be processed by the
/// [handle_radio_event] function. The split is there because it allows this
/// function to be cancellable.
async fn wait_for_radio_event<P: Phy>(
    phy: &mut P,
    mac_pib: &MacPib,
    mac_state: &MacState<'_>,
    delay: &mut impl DelayNsExt,
) -> RadioEvent<P> {
    let current_time = match phy.get_instant().await {
        Ok(current_time) => current_time,
        Err(_) => {
            error!("Could not get the current time");
            return RadioEvent::Error;
        }
    };

    // Keep the transceiver aligned with the mode: receiving through any open
    // wait window (or when the receiver is pinned on), off while asleep.
    if mac_state.rx_should_be_on(mac_pib.rx_on_when_idle) {
        if phy.start_receive().await.is_err() {
            error!("Could not start receiving");
            return RadioEvent::Error;
        }
    } else if phy.stop_receive().await.is_err() {
        error!("Could not stop receiving");
        return RadioEvent::Error;
    }

    let ack_wait = wait_until(mac_state.timers.ack_wait, current_time, delay.clone());
    let data_wait = wait_until(mac_state.timers.rit_data_wait, current_time, delay.clone());
    let tx_wait = wait_until(mac_state.timers.rit_tx_wait, current_time, delay.clone());
    let ifs = wait_until(mac_state.timers.ifs, current_time, delay.clone());
    let periodic = wait_until(
        mac_state.timers.periodic_rit_data_request,
        current_time,
        delay.clone(),
    );
    let phy_wait = phy.wait();

    futures::select_biased! {
        wait_result = phy_wait.fuse() => {
            match wait_result {
                Ok(context) => RadioEvent::PhyWaitDone { context },
                Err(_) => {
                    error!("Phy wait error");
                    RadioEvent::Error
                }
            }
        },
        _ = ack_wait.fuse() => RadioEvent::AckWaitTimeout,
        _ = data_wait.fuse() => RadioEvent::RitDataWaitTimeout,
        _ = tx_wait.fuse() => RadioEvent::RitTxWaitTimeout,
        _ = ifs.fuse() => RadioEvent::IfsTimeout,
        _ = periodic.fuse() => RadioEvent::PeriodicRitDataRequest,
    }
}

/// Sleep until the deadline, or forever when no instance is armed.
async fn wait_until(deadline: Option<Instant>, now: Instant, mut delay: impl DelayNsExt) {
    match deadline {
        Some(at) => delay.delay_duration(at.duration_since(now)).await,
        None => core::future::pending().await,
    }
}

async fn handle_radio_event<'a, P: Phy, Rng: RngCore, Delay: DelayNsExt>(
    event: RadioEvent<P>,
    phy: &mut P,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    handler: &MacHandler<'a>,
    config: &mut MacConfig<Rng, Delay>,
) {
    match event {
        RadioEvent::Error => {}
        RadioEvent::PhyWaitDone { context } => match phy.process(context).await {
            Ok(Some(message)) => {
                rit::process_message(message, phy, mac_pib, mac_state, handler, config).await
            }
            Ok(None) => {}
            Err(_) => {
                error!("Phy process error");
            }
        },
        RadioEvent::PeriodicRitDataRequest => {
            rit::periodic_rit_data_request(phy, mac_pib, mac_state, config).await
        }
        RadioEvent::RitDataWaitTimeout => {
            rit::receiver_cycle_timeout(phy, mac_pib, mac_state).await
        }
        RadioEvent::RitTxWaitTimeout => rit::sender_cycle_timeout(phy, mac_pib, mac_state).await,
        RadioEvent::AckWaitTimeout => rit::ack_wait_timeout(phy, mac_pib, mac_state, config).await,
        RadioEvent::IfsTimeout => rit::ifs_wait_timeout(phy, mac_pib, mac_state, config).await,
    }
}

async fn handle_request<'a, Rng: RngCore, Delay: DelayNsExt>(
    responder: RequestResponder<'a, RequestValue>,
    phy: &mut (impl Phy + 'a),
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    config: &mut MacConfig<Rng, Delay>,
) {
    match &responder.request {
        RequestValue::Data(_) => {
            mcps_data::process_data_request(
                phy,
                mac_pib,
                mac_state,
                config,
                responder.into_concrete(),
            )
            .await
        }
        RequestValue::Get(_) => {
            mlme_get::process_get_request(phy, &*mac_pib, responder.into_concrete()).await
        }
        RequestValue::Set(_) => {
            mlme_set::process_set_request(
                phy,
                mac_pib,
                mac_state,
                config,
                responder.into_concrete(),
            )
            .await
        }
        RequestValue::Reset(_) => {
            mlme_reset::process_reset_request(
                phy,
                mac_pib,
                mac_state,
                config,
                responder.into_concrete(),
            )
            .await
        }
        RequestValue::RitModuleConfig(_) => {
            process_module_config_request(mac_state, responder.into_concrete())
        }
    }
}

fn process_module_config_request<'a>(
    mac_state: &mut MacState<'a>,
    responder: RequestResponder<'a, RitModuleConfigRequest>,
) {
    let request = responder.request;

    let status = match request.config.validate() {
        Ok(()) => {
            mac_state.module_config = request.config;
            mac_state.rx_always_on = request.rx_always_on;
            Status::Success
        }
        Err(e) => {
            error!("Invalid module config: {}", e);
            Status::InvalidParameter
        }
    };

    responder.respond(RitModuleConfigConfirm { status });
}
