use heapless::Vec;

use crate::{
    pib::PhyPib,
    time::{Duration, Instant},
};

/// The interface the MAC engine drives the radio through.
///
/// Implementations live outside the core: the test harness provides a
/// simulated radio on a shared medium.
pub trait Phy {
    #[cfg(not(feature = "defmt-03"))]
    type Error: core::error::Error;
    #[cfg(feature = "defmt-03")]
    type Error: core::error::Error + defmt::Format;

    type ProcessingContext;

    /// Reset the phy and its pib back to the defaults as if it was newly created.
    async fn reset(&mut self) -> Result<(), Self::Error>;

    /// Get the current time of the radio.
    async fn get_instant(&mut self) -> Result<Instant, Self::Error>;

    /// Get the amount of time each symbol takes.
    fn symbol_period(&self) -> Duration;

    /// Send a frame.
    ///
    /// - `data` must be a complete MPDU.
    /// - If `send_time` is some, the transmission starts at that instant.
    /// - `continuation` selects what the radio does after the transmission.
    ///
    /// Completion of this call is the transmit confirmation: the returned
    /// instant is the time the frame left the radio.
    async fn send(
        &mut self,
        data: &[u8],
        send_time: Option<Instant>,
        continuation: SendContinuation,
    ) -> Result<Instant, Self::Error>;

    /// Enable the receiver.
    ///
    /// Calling this while the radio is already receiving is a no-op.
    /// A received frame is returned from [Self::process].
    async fn start_receive(&mut self) -> Result<(), Self::Error>;

    /// Force the transceiver off and go back to idle.
    async fn stop_receive(&mut self) -> Result<(), Self::Error>;

    /// Perform a single clear-channel assessment and report the verdict.
    async fn cca(&mut self) -> Result<CcaStatus, Self::Error>;

    /// Wait for something to happen. When not doing anything else with the
    /// phy, this function should be running. It is cancel-safe, so it can be
    /// raced in a select while retaining access to the other trait functions.
    async fn wait(&mut self) -> Result<Self::ProcessingContext, Self::Error>;

    /// Process the context produced by [Self::wait]. Not cancel-safe.
    /// If a frame was received, it is returned.
    async fn process(
        &mut self,
        ctx: Self::ProcessingContext,
    ) -> Result<Option<ReceivedMessage>, Self::Error>;

    /// Update the writable PHY PIB values.
    async fn update_phy_pib<U>(
        &mut self,
        f: impl FnOnce(&mut PhyPib) -> U,
    ) -> Result<U, Self::Error>;

    /// Read the PHY PIB.
    fn get_phy_pib(&mut self) -> &PhyPib;
}

/// What the radio does once a transmission has completed.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum SendContinuation {
    /// Go back to idle.
    Idle,
    /// Immediately go back to receiving frames.
    ReceiveContinuous,
}

/// The outcome of a clear-channel assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum CcaStatus {
    Idle,
    Busy,
    /// The transceiver was off; treated as a failed assessment.
    TrxOff,
}

/// A frame delivered by the radio.
pub struct ReceivedMessage {
    /// The time at which the frame was received.
    pub timestamp: Instant,
    pub data: Vec<u8, { crate::consts::MAX_PHY_PACKET_SIZE }>,
    /// Link quality indication, 0x00 to 0xFF.
    pub lqi: u8,
    /// The channel the frame was received on.
    pub channel: u8,
}
