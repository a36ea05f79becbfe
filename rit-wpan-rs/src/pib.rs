use crate::{
    consts::{ACK_WAIT_DURATION, BASE_SUPERFRAME_DURATION},
    sap::Status,
    time::Duration,
    wire::{ExtendedAddress, PanId, ShortAddress},
};

/// Maximum length of the RIT request payload carried in a beacon.
pub const MAX_RIT_REQUEST_PAYLOAD: usize = 16;

/// The octet string carried in the RIT Data Request command.
pub type RitRequestPayload = heapless::Vec<u8, MAX_RIT_REQUEST_PAYLOAD>;

/// A wrapping 8-bit sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct SequenceNumber(u8);

impl SequenceNumber {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Return the current value and advance.
    pub fn next(&mut self) -> u8 {
        let value = self.0;
        self.0 = self.0.wrapping_add(1);
        value
    }
}

/// The CCA modes of 8.2.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum CcaMode {
    #[default]
    EnergyDetect,
    CarrierSense,
    CarrierSenseAndEnergyDetect,
    Aloha,
}

/// The PHY PIB attributes the simulation model reads and writes.
#[derive(Debug, Clone)]
pub struct PhyPib {
    #[doc(alias = "phyCurrentChannel")]
    pub current_channel: u8,
    #[doc(alias = "phyCCAMode")]
    pub cca_mode: CcaMode,
    /// The transmit power of the device in dBm.
    #[doc(alias = "phyTXPower")]
    pub tx_power: i8,
}

impl PhyPib {
    /// A pib containing reasonable dummy values
    pub fn unspecified_new() -> Self {
        Self {
            current_channel: 11,
            cca_mode: CcaMode::EnergyDetect,
            tx_power: 0,
        }
    }

    pub fn get(&self, attribute: &str) -> Option<PibValue> {
        match attribute {
            PibValue::PHY_CURRENT_CHANNEL => Some(PibValue::PhyCurrentChannel(self.current_channel)),
            PibValue::PHY_CCA_MODE => Some(PibValue::PhyCcaMode(self.cca_mode)),
            PibValue::PHY_TX_POWER => Some(PibValue::PhyTxPower(self.tx_power)),
            _ => None,
        }
    }

    pub fn try_set(&mut self, attribute: &str, value: &PibValue) -> Option<Status> {
        match (attribute, value) {
            (PibValue::PHY_CURRENT_CHANNEL, PibValue::PhyCurrentChannel(channel)) => {
                self.current_channel = *channel;
                Some(Status::Success)
            }
            (PibValue::PHY_CCA_MODE, PibValue::PhyCcaMode(mode)) => {
                self.cca_mode = *mode;
                Some(Status::Success)
            }
            (PibValue::PHY_TX_POWER, PibValue::PhyTxPower(power)) => {
                self.tx_power = *power;
                Some(Status::Success)
            }
            (
                PibValue::PHY_CURRENT_CHANNEL | PibValue::PHY_CCA_MODE | PibValue::PHY_TX_POWER,
                _,
            ) => Some(Status::InvalidParameter),
            _ => None,
        }
    }
}

/// The RIT parameters, exposed as PIB-like attributes in the vendor range.
///
/// Both the legacy integer form (in units of aBaseSuperframeDuration) and the
/// time-based form are stored; `use_time_based_params` selects which one is
/// effective.
#[derive(Debug, Clone)]
pub struct RitPib {
    #[doc(alias = "macRitPeriod")]
    pub period: u32,
    #[doc(alias = "macRitDataWaitDuration")]
    pub data_wait_duration: u8,
    #[doc(alias = "macRitTxWaitDuration")]
    pub tx_wait_duration: u32,
    #[doc(alias = "macRitRequestPayload")]
    pub request_payload: RitRequestPayload,
    #[doc(alias = "macRitPeriodTime")]
    pub period_time: Duration,
    #[doc(alias = "macRitDataWaitDurationTime")]
    pub data_wait_duration_time: Duration,
    #[doc(alias = "macRitTxWaitDurationTime")]
    pub tx_wait_duration_time: Duration,
    pub use_time_based_params: bool,
}

impl Default for RitPib {
    fn default() -> Self {
        Self {
            period: 0,
            data_wait_duration: 1,
            tx_wait_duration: 65,
            request_payload: RitRequestPayload::new(),
            period_time: Duration::ZERO,
            data_wait_duration_time: Duration::from_millis(10),
            tx_wait_duration_time: Duration::from_millis(5000),
            use_time_based_params: true,
        }
    }
}

/// The MAC PIB attributes the RIT engine consumes.
#[derive(Debug, Clone)]
pub struct MacPib {
    #[doc(alias = "macPANId")]
    pub pan_id: PanId,
    #[doc(alias = "macShortAddress")]
    pub short_address: ShortAddress,
    #[doc(alias = "macExtendedAddress")]
    pub extended_address: ExtendedAddress,
    #[doc(alias = "macDSN")]
    pub dsn: SequenceNumber,
    #[doc(alias = "macPromiscuousMode")]
    pub promiscuous_mode: bool,
    #[doc(alias = "macRxOnWhenIdle")]
    pub rx_on_when_idle: bool,
    #[doc(alias = "macMaxFrameRetries")]
    pub max_frame_retries: u8,
    /// SIFS length in symbols.
    #[doc(alias = "macSIFSPeriod")]
    pub sifs_period: u8,
    /// LIFS length in symbols.
    #[doc(alias = "macLIFSPeriod")]
    pub lifs_period: u8,
    /// Whether frames carry (and reception checks) the FCS trailer.
    pub fcs_enabled: bool,
    pub rit: RitPib,
}

impl MacPib {
    pub fn new(extended_address: ExtendedAddress) -> Self {
        Self {
            pan_id: PanId::broadcast(),
            short_address: ShortAddress::BROADCAST,
            extended_address,
            dsn: SequenceNumber::new(0),
            promiscuous_mode: false,
            rx_on_when_idle: true,
            max_frame_retries: 0,
            sifs_period: 12,
            lifs_period: 40,
            fcs_enabled: true,
            rit: RitPib::default(),
        }
    }

    /// Convert a legacy integer RIT attribute (units of
    /// aBaseSuperframeDuration) into a time value.
    pub fn duration_to_time(duration: u32) -> Duration {
        Duration::from_symbols(duration as i64 * BASE_SUPERFRAME_DURATION as i64)
    }

    /// The effective RIT period as a time value.
    pub fn rit_period_time(&self) -> Duration {
        if self.rit.use_time_based_params {
            self.rit.period_time
        } else {
            Self::duration_to_time(self.rit.period)
        }
    }

    /// The effective receiver-side data wait window.
    pub fn rit_data_wait_duration_time(&self) -> Duration {
        if self.rit.use_time_based_params {
            self.rit.data_wait_duration_time
        } else {
            Self::duration_to_time(self.rit.data_wait_duration as u32)
        }
    }

    /// The effective sender-side beacon wait window.
    pub fn rit_tx_wait_duration_time(&self) -> Duration {
        if self.rit.use_time_based_params {
            self.rit.tx_wait_duration_time
        } else {
            Self::duration_to_time(self.rit.tx_wait_duration)
        }
    }

    /// RIT is enabled while the configured period is positive.
    pub fn is_rit_enabled(&self) -> bool {
        if self.rit.use_time_based_params {
            self.rit.period_time.is_positive()
        } else {
            self.rit.period > 0
        }
    }

    /// The time to wait for an acknowledgment after a transmission.
    pub fn ack_wait_duration(&self) -> Duration {
        Duration::from_symbols(ACK_WAIT_DURATION as i64)
    }

    /// The short interframe spacing as a time value.
    pub fn sifs_time(&self) -> Duration {
        Duration::from_symbols(self.sifs_period as i64)
    }

    pub fn get(&self, attribute: &str) -> Option<PibValue> {
        match attribute {
            PibValue::MAC_PAN_ID => Some(PibValue::MacPanId(self.pan_id)),
            PibValue::MAC_SHORT_ADDRESS => Some(PibValue::MacShortAddress(self.short_address)),
            PibValue::MAC_EXTENDED_ADDRESS => {
                Some(PibValue::MacExtendedAddress(self.extended_address))
            }
            PibValue::MAC_PROMISCUOUS_MODE => {
                Some(PibValue::MacPromiscuousMode(self.promiscuous_mode))
            }
            PibValue::MAC_RX_ON_WHEN_IDLE => Some(PibValue::MacRxOnWhenIdle(self.rx_on_when_idle)),
            PibValue::MAC_MAX_FRAME_RETRIES => {
                Some(PibValue::MacMaxFrameRetries(self.max_frame_retries))
            }
            PibValue::MAC_RIT_PERIOD => Some(PibValue::MacRitPeriod(self.rit.period)),
            PibValue::MAC_RIT_DATA_WAIT_DURATION => {
                Some(PibValue::MacRitDataWaitDuration(self.rit.data_wait_duration))
            }
            PibValue::MAC_RIT_TX_WAIT_DURATION => {
                Some(PibValue::MacRitTxWaitDuration(self.rit.tx_wait_duration))
            }
            PibValue::MAC_RIT_REQUEST_PAYLOAD => Some(PibValue::MacRitRequestPayload(
                self.rit.request_payload.clone(),
            )),
            PibValue::MAC_RIT_PERIOD_TIME => Some(PibValue::MacRitPeriodTime(self.rit.period_time)),
            PibValue::MAC_RIT_DATA_WAIT_DURATION_TIME => Some(PibValue::MacRitDataWaitDurationTime(
                self.rit.data_wait_duration_time,
            )),
            PibValue::MAC_RIT_TX_WAIT_DURATION_TIME => Some(PibValue::MacRitTxWaitDurationTime(
                self.rit.tx_wait_duration_time,
            )),
            _ => None,
        }
    }

    /// Set a non-RIT MAC attribute. RIT attributes carry cycle start/stop
    /// side effects and are handled by the engine.
    pub fn try_set(&mut self, attribute: &str, value: &PibValue) -> Option<Status> {
        match (attribute, value) {
            (PibValue::MAC_PAN_ID, PibValue::MacPanId(pan_id)) => {
                self.pan_id = *pan_id;
                Some(Status::Success)
            }
            (PibValue::MAC_SHORT_ADDRESS, PibValue::MacShortAddress(address)) => {
                self.short_address = *address;
                Some(Status::Success)
            }
            (PibValue::MAC_EXTENDED_ADDRESS, _) => Some(Status::ReadOnly),
            (PibValue::MAC_PROMISCUOUS_MODE, PibValue::MacPromiscuousMode(enabled)) => {
                self.promiscuous_mode = *enabled;
                Some(Status::Success)
            }
            (PibValue::MAC_RX_ON_WHEN_IDLE, PibValue::MacRxOnWhenIdle(enabled)) => {
                self.rx_on_when_idle = *enabled;
                Some(Status::Success)
            }
            (PibValue::MAC_MAX_FRAME_RETRIES, PibValue::MacMaxFrameRetries(retries)) => {
                self.max_frame_retries = *retries;
                Some(Status::Success)
            }
            (
                PibValue::MAC_PAN_ID
                | PibValue::MAC_SHORT_ADDRESS
                | PibValue::MAC_PROMISCUOUS_MODE
                | PibValue::MAC_RX_ON_WHEN_IDLE
                | PibValue::MAC_MAX_FRAME_RETRIES,
                _,
            ) => Some(Status::InvalidParameter),
            _ => None,
        }
    }
}

/// A typed PIB attribute value, tagged with the attribute name constants used
/// on the MLME-GET/MLME-SET surface.
#[derive(Debug, Clone, PartialEq)]
pub enum PibValue {
    MacPanId(PanId),
    MacShortAddress(ShortAddress),
    MacExtendedAddress(ExtendedAddress),
    MacPromiscuousMode(bool),
    MacRxOnWhenIdle(bool),
    MacMaxFrameRetries(u8),
    MacRitPeriod(u32),
    MacRitDataWaitDuration(u8),
    MacRitTxWaitDuration(u32),
    MacRitRequestPayload(RitRequestPayload),
    MacRitPeriodTime(Duration),
    MacRitDataWaitDurationTime(Duration),
    MacRitTxWaitDurationTime(Duration),
    PhyCurrentChannel(u8),
    PhyCcaMode(CcaMode),
    PhyTxPower(i8),
    None,
}

impl PibValue {
    pub const MAC_PAN_ID: &'static str = "macPanId";
    pub const MAC_SHORT_ADDRESS: &'static str = "macShortAddress";
    pub const MAC_EXTENDED_ADDRESS: &'static str = "macExtendedAddress";
    pub const MAC_PROMISCUOUS_MODE: &'static str = "macPromiscuousMode";
    pub const MAC_RX_ON_WHEN_IDLE: &'static str = "macRxOnWhenIdle";
    pub const MAC_MAX_FRAME_RETRIES: &'static str = "macMaxFrameRetries";
    pub const MAC_RIT_PERIOD: &'static str = "macRitPeriod";
    pub const MAC_RIT_DATA_WAIT_DURATION: &'static str = "macRitDataWaitDuration";
    pub const MAC_RIT_TX_WAIT_DURATION: &'static str = "macRitTxWaitDuration";
    pub const MAC_RIT_REQUEST_PAYLOAD: &'static str = "macRitRequestPayload";
    pub const MAC_RIT_PERIOD_TIME: &'static str = "macRitPeriodTime";
    pub const MAC_RIT_DATA_WAIT_DURATION_TIME: &'static str = "macRitDataWaitDurationTime";
    pub const MAC_RIT_TX_WAIT_DURATION_TIME: &'static str = "macRitTxWaitDurationTime";
    pub const PHY_CURRENT_CHANNEL: &'static str = "phyCurrentChannel";
    pub const PHY_CCA_MODE: &'static str = "phyCcaMode";
    pub const PHY_TX_POWER: &'static str = "phyTxPower";

    /// Whether the attribute name falls in the RIT vendor range.
    pub fn is_rit_attribute(attribute: &str) -> bool {
        attribute.starts_with("macRit")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_number_wraps() {
        let mut seq = SequenceNumber::new(0xFF);
        assert_eq!(seq.next(), 0xFF);
        assert_eq!(seq.next(), 0x00);
    }

    #[test]
    fn legacy_duration_conversion() {
        // One aBaseSuperframeDuration = 960 symbols = 15.36 ms at 62.5 ksym/s
        assert_eq!(MacPib::duration_to_time(1), Duration::from_micros(15_360));
    }

    #[test]
    fn effective_rit_parameters_follow_the_selected_form() {
        let mut pib = MacPib::new(ExtendedAddress(1));
        pib.rit.period_time = Duration::from_seconds(1);
        pib.rit.period = 2;

        assert_eq!(pib.rit_period_time(), Duration::from_seconds(1));
        assert!(pib.is_rit_enabled());

        pib.rit.use_time_based_params = false;
        assert_eq!(pib.rit_period_time(), MacPib::duration_to_time(2));

        pib.rit.period = 0;
        assert!(!pib.is_rit_enabled());
    }

    #[test]
    fn base_attribute_get_set() {
        let mut pib = MacPib::new(ExtendedAddress(7));

        let status = pib.try_set(
            PibValue::MAC_SHORT_ADDRESS,
            &PibValue::MacShortAddress(ShortAddress(0x0042)),
        );
        assert_eq!(status, Some(Status::Success));
        assert_eq!(
            pib.get(PibValue::MAC_SHORT_ADDRESS),
            Some(PibValue::MacShortAddress(ShortAddress(0x0042)))
        );

        // Type confusion is rejected
        let status = pib.try_set(PibValue::MAC_PAN_ID, &PibValue::MacRxOnWhenIdle(true));
        assert_eq!(status, Some(Status::InvalidParameter));

        // Unknown attributes fall through
        assert_eq!(pib.try_set("macUnknown", &PibValue::None), None);
    }

    #[test]
    fn rit_attribute_range() {
        assert!(PibValue::is_rit_attribute(PibValue::MAC_RIT_PERIOD_TIME));
        assert!(!PibValue::is_rit_attribute(PibValue::MAC_SHORT_ADDRESS));
    }
}
