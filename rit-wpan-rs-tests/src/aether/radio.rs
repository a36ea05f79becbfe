use std::sync::{Arc, Mutex, MutexGuard};

use async_channel::Receiver;
use log::trace;
use rit_wpan_rs::{
    phy::{CcaStatus, Phy, ReceivedMessage, SendContinuation},
    pib::PhyPib,
    time::{Duration, Instant},
};

use crate::{
    aether::{air_time, AetherInner, AirPacket, Coordinate, NodeId},
    time::SimulationTime,
};

/// Single radio connected to an [`super::Aether`].
#[derive(Debug)]
pub struct AetherRadio {
    inner: Arc<Mutex<AetherInner>>,
    node_id: NodeId,
    antenna: Receiver<AirPacket>,
    local_pib: PhyPib,
    /// A frame taken off the antenna whose arrival instant has not been
    /// reached yet. Kept here so that cancelling [Phy::wait] never loses it.
    pending: Option<AirPacket>,
}

impl AetherRadio {
    pub(crate) fn new(
        inner: Arc<Mutex<AetherInner>>,
        node_id: NodeId,
        antenna: Receiver<AirPacket>,
        local_pib: PhyPib,
    ) -> Self {
        Self {
            inner,
            node_id,
            antenna,
            local_pib,
            pending: None,
        }
    }

    pub fn move_to(&mut self, position: Coordinate) {
        let node_id = self.node_id.clone();
        self.aether().with_node(&node_id, |node| {
            node.position = position;
        });
    }

    fn aether(&self) -> MutexGuard<'_, AetherInner> {
        self.inner.lock().unwrap()
    }

    fn simulation_time(&self) -> &'static SimulationTime {
        self.aether().simulation_time
    }

    fn set_rx_enable(&mut self, enabled: bool) {
        let node_id = self.node_id.clone();
        self.aether().with_node(&node_id, |node| {
            node.rx_enable = enabled;
        });
    }
}

impl Phy for AetherRadio {
    type Error = core::convert::Infallible;
    type ProcessingContext = ReceivedMessage;

    async fn reset(&mut self) -> Result<(), Self::Error> {
        trace!("Radio reset {:?}", self.node_id);

        self.stop_receive().await?;
        self.local_pib = PhyPib::unspecified_new();
        self.pending = None;

        Ok(())
    }

    async fn get_instant(&mut self) -> Result<Instant, Self::Error> {
        Ok(self.simulation_time().now())
    }

    fn symbol_period(&self) -> Duration {
        rit_wpan_rs::time::SYMBOL_PERIOD
    }

    async fn send(
        &mut self,
        data: &[u8],
        send_time: Option<Instant>,
        continuation: SendContinuation,
    ) -> Result<Instant, Self::Error> {
        let simulation_time = self.simulation_time();

        if let Some(send_time) = send_time {
            simulation_time.delay_until(send_time).await;
        }

        let start = simulation_time.now();
        let duration = air_time(data.len());
        let end = start + duration;

        trace!("Radio send {:?} at {}", self.node_id, start);

        let channel = self.local_pib.current_channel;
        self.aether().begin_transmission(channel, start, end);

        // The transmitter is occupied for the duration of the frame
        simulation_time.delay_until(end).await;

        let packet = AirPacket {
            data: heapless::Vec::from_slice(data).expect("frames fit the PHY packet size"),
            time_stamp: end,
            channel,
        };
        let node_id = self.node_id.clone();
        self.aether().send(&node_id, packet);

        match continuation {
            SendContinuation::Idle => self.stop_receive().await?,
            SendContinuation::ReceiveContinuous => self.start_receive().await?,
        }

        Ok(end)
    }

    async fn start_receive(&mut self) -> Result<(), Self::Error> {
        self.set_rx_enable(true);
        Ok(())
    }

    async fn stop_receive(&mut self) -> Result<(), Self::Error> {
        self.set_rx_enable(false);
        Ok(())
    }

    async fn cca(&mut self) -> Result<CcaStatus, Self::Error> {
        let busy = self.aether().channel_busy(self.local_pib.current_channel);

        Ok(if busy {
            CcaStatus::Busy
        } else {
            CcaStatus::Idle
        })
    }

    async fn wait(&mut self) -> Result<Self::ProcessingContext, Self::Error> {
        loop {
            if self.pending.is_none() {
                let packet = self
                    .antenna
                    .recv()
                    .await
                    .expect("only we can close the antenna");

                if packet.channel != self.local_pib.current_channel {
                    continue;
                }

                self.pending = Some(packet);
            }

            let arrival = self.pending.as_ref().expect("just stored").time_stamp;
            self.simulation_time().delay_until(arrival).await;

            let packet = self.pending.take().expect("still stored");
            return Ok(ReceivedMessage {
                timestamp: packet.time_stamp,
                data: packet.data,
                lqi: 255,
                channel: packet.channel,
            });
        }
    }

    async fn process(
        &mut self,
        ctx: Self::ProcessingContext,
    ) -> Result<Option<ReceivedMessage>, Self::Error> {
        trace!("Radio process {:?}", self.node_id);

        Ok(Some(ctx))
    }

    async fn update_phy_pib<U>(
        &mut self,
        f: impl FnOnce(&mut PhyPib) -> U,
    ) -> Result<U, Self::Error> {
        Ok(f(&mut self.local_pib))
    }

    fn get_phy_pib(&mut self) -> &PhyPib {
        &self.local_pib
    }
}
