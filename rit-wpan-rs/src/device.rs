//! The net-device composite: the wiring point between the application, the
//! rank forwarding layer and the MAC.
//!
//! A device is two background tasks ([`crate::mac::run_mac_engine`] and
//! [`crate::nwk::run_nwk`]) plus this handle type for the application
//! surface. [`configure_device`] applies a validated configuration through
//! the MLME, ending with the RIT period so the cycle starts fully
//! configured.

use core::fmt::Display;

use crate::{
    mac::{MacCommander, ModuleConfig, ModuleConfigError},
    nwk::{NwkCounters, NwkHandle, NwkReceived},
    pib::PibValue,
    sap::{
        data::MacPayload,
        rit::RitModuleConfigRequest,
        set::SetRequest,
        Status,
    },
    time::Duration,
    wire::{PanId, ShortAddress},
    DeviceAddress,
};

/// Install-time parameters of one node.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub short_addr: ShortAddress,
    pub pan_id: PanId,
    pub rank: u16,
    /// The RIT period; zero leaves the MAC in its disabled (always-on) mode.
    pub rit_period: Duration,
    pub rit_data_wait: Duration,
    pub rit_tx_wait: Duration,
    pub rx_always_on: bool,
    pub module_config: ModuleConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            short_addr: ShortAddress(0),
            pan_id: PanId(0),
            rank: 0,
            rit_period: Duration::from_seconds(5),
            rit_data_wait: Duration::from_millis(10),
            rit_tx_wait: Duration::from_millis(5000),
            rx_always_on: false,
            module_config: ModuleConfig::default(),
        }
    }
}

/// A configuration rejected at install time, before any event runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ModuleConfig(ModuleConfigError),
    Attribute {
        attribute: &'static str,
        status: Status,
    },
}

impl From<ModuleConfigError> for ConfigError {
    fn from(value: ModuleConfigError) -> Self {
        Self::ModuleConfig(value)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::ModuleConfig(e) => write!(f, "invalid module config: {e}"),
            ConfigError::Attribute { attribute, status } => {
                write!(f, "setting {attribute} failed with {status:?}")
            }
        }
    }
}

impl core::error::Error for ConfigError {}

/// Apply a device configuration through the management plane.
///
/// The module-config flags are validated first: a conflicting carrier-sense
/// selection is rejected before a single request reaches the MAC. The RIT
/// period is applied last, so the cycle starts with every other parameter in
/// place.
pub async fn configure_device(
    commander: &MacCommander,
    config: &DeviceConfig,
) -> Result<(), ConfigError> {
    config.module_config.validate()?;

    let attributes = [
        (
            PibValue::MAC_SHORT_ADDRESS,
            PibValue::MacShortAddress(config.short_addr),
        ),
        (PibValue::MAC_PAN_ID, PibValue::MacPanId(config.pan_id)),
        (
            PibValue::MAC_RIT_DATA_WAIT_DURATION_TIME,
            PibValue::MacRitDataWaitDurationTime(config.rit_data_wait),
        ),
        (
            PibValue::MAC_RIT_TX_WAIT_DURATION_TIME,
            PibValue::MacRitTxWaitDurationTime(config.rit_tx_wait),
        ),
    ];

    for (attribute, value) in attributes {
        set_attribute(commander, attribute, value).await?;
    }

    let confirm = commander
        .request(RitModuleConfigRequest {
            config: config.module_config,
            rx_always_on: config.rx_always_on,
        })
        .await;
    if confirm.status != Status::Success {
        return Err(ConfigError::Attribute {
            attribute: "ritModuleConfig",
            status: confirm.status,
        });
    }

    set_attribute(
        commander,
        PibValue::MAC_RIT_PERIOD_TIME,
        PibValue::MacRitPeriodTime(config.rit_period),
    )
    .await?;

    Ok(())
}

async fn set_attribute(
    commander: &MacCommander,
    attribute: &'static str,
    value: PibValue,
) -> Result<(), ConfigError> {
    let confirm = commander
        .request(SetRequest {
            pib_attribute: attribute,
            pib_attribute_value: value,
        })
        .await;

    if confirm.status != Status::Success {
        return Err(ConfigError::Attribute {
            attribute,
            status: confirm.status,
        });
    }

    Ok(())
}

/// The application-facing surface of one node.
#[derive(Clone, Copy)]
pub struct RitWpanDevice<'a> {
    commander: &'a MacCommander,
    nwk: &'a NwkHandle,
}

impl<'a> RitWpanDevice<'a> {
    pub fn new(commander: &'a MacCommander, nwk: &'a NwkHandle) -> Self {
        Self { commander, nwk }
    }

    pub fn commander(&self) -> &'a MacCommander {
        self.commander
    }

    /// Hand a packet to the forwarding layer. Returns whether it was
    /// accepted: a destination that is not a 16-bit address, an oversized
    /// payload or a full send queue all reject the packet.
    ///
    /// The protocol number exists for interface parity; this device carries
    /// no protocol multiplexing.
    pub fn send(&self, payload: &[u8], dst: DeviceAddress, _protocol_number: u16) -> bool {
        let DeviceAddress::Short(dst) = dst else {
            warn!("Only 16-bit destinations are routable");
            return false;
        };

        let Ok(payload) = MacPayload::from_slice(payload) else {
            warn!("Payload too large for a frame");
            return false;
        };

        self.nwk.outbound.try_send((payload, dst)).is_ok()
    }

    /// Wait for the next packet delivered to this node.
    pub async fn receive(&self) -> NwkReceived {
        self.nwk.inbound.receive().await
    }

    pub fn counters(&self) -> &'a NwkCounters {
        self.nwk.counters()
    }
}
