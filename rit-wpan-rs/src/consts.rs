//! The constants defined in tables 51 and 70, plus the O-QPSK timing the
//! simulation model is calibrated against.

/// The number of symbols forming a superframe slot
/// when the superframe order is equal to zero.
#[doc(alias = "aBaseSlotDuration")]
pub const BASE_SLOT_DURATION: u32 = 60;

/// The number of symbols forming a superframe when
/// the superframe order is equal to zero.
///
/// Also the unit of the legacy integer RIT PIB attributes.
#[doc(alias = "aBaseSuperframeDuration")]
pub const BASE_SUPERFRAME_DURATION: u32 = BASE_SLOT_DURATION * NUM_SUPERFRAME_SLOTS;

/// The number of slots contained in any superframe.
#[doc(alias = "aNumSuperframeSlots")]
pub const NUM_SUPERFRAME_SLOTS: u32 = 16;

/// The maximum PSDU size (in octets) the PHY shall be able to receive.
#[doc(alias = "aMaxPHYPacketSize")]
pub const MAX_PHY_PACKET_SIZE: usize = 127;

/// The minimum number of octets added by the MAC sublayer to the PSDU.
#[doc(alias = "aMinMPDUOverhead")]
pub const MIN_MPDU_OVERHEAD: usize = 9;

/// The maximum number of octets that can be transmitted in the MAC Payload field.
#[doc(alias = "aMaxMACPayloadSize")]
pub const MAX_MAC_PAYLOAD_SIZE: usize = MAX_PHY_PACKET_SIZE - MIN_MPDU_OVERHEAD;

/// The number of symbols forming the basic time period
/// used by the CSMA-CA algorithm.
#[doc(alias = "aUnitBackoffPeriod")]
pub const UNIT_BACKOFF_PERIOD: u32 = 20;

/// RX-to-TX or TX-to-RX turnaround time (in symbol periods).
#[doc(alias = "aTurnaroundTime")]
pub const TURNAROUND_TIME: u32 = 12;

/// Symbol rate of the 2.4 GHz O-QPSK PHY, in symbols per second.
pub const SYMBOL_RATE: u32 = 62_500;

/// Duration of one O-QPSK symbol in microseconds.
pub const SYMBOL_PERIOD_US: u32 = 16;

/// The number of symbols to wait for an acknowledgment before giving up.
///
/// aUnitBackoffPeriod + aTurnaroundTime + SHR duration + one octet at the
/// 2.4 GHz O-QPSK rate, rounded the way the standard does.
#[doc(alias = "macAckWaitDuration")]
pub const ACK_WAIT_DURATION: u32 = 120;
