//! Radio simulation infrastructure
//!
//! This module provides a simulated medium connecting several radios. It
//! routes frames with propagation delay, tracks in-flight transmissions so
//! clear-channel assessments see a busy medium, and can capture everything
//! into a pcapng trace for assertions.

use core::fmt::Debug;
use std::{
    borrow::Cow,
    collections::HashMap,
    fs::File,
    io::{Seek, Write},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use async_channel::{bounded, Sender, TrySendError};
use byte::TryRead;
use heapless::Vec;
use pcap_file::{
    pcapng::{
        blocks::{
            enhanced_packet::EnhancedPacketBlock,
            interface_description::{InterfaceDescriptionBlock, InterfaceDescriptionOption},
        },
        Block, PcapNgReader, PcapNgWriter,
    },
    DataLink,
};
use rit_wpan_rs::{
    pib::PhyPib,
    time::{Duration, Instant},
    wire::{FooterMode, Frame},
};

mod radio;
mod space_time;

pub use radio::AetherRadio;
pub use space_time::{Coordinate, Meters};

use crate::time::{into_std_duration, SimulationTime};

/// Time on the air per octet at the 250 kb/s O-QPSK rate.
const OCTET_AIR_TIME: Duration = Duration::from_micros(32);

/// Synchronization header plus PHY header, in octets.
const PHY_OVERHEAD: usize = 6;

pub fn air_time(psdu_length: usize) -> Duration {
    OCTET_AIR_TIME * (PHY_OVERHEAD + psdu_length) as i64
}

/// A medium to which radios are connected.
///
/// This takes care of routing the packets to the right radios.
pub struct Aether {
    inner: Arc<Mutex<AetherInner>>,
}

impl Aether {
    /// Create a new empty aether
    pub fn new(simulation_time: &'static SimulationTime) -> Self {
        let inner = AetherInner {
            nodes: Default::default(),
            transmissions: Default::default(),
            pcap_trace: None,
            simulation_time,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Create a radio which lives in the aether
    pub fn radio(&mut self) -> AetherRadio {
        let (tx, rx) = bounded(16);

        let node = Node {
            position: Coordinate::default(),
            antenna: tx,
            rx_enable: false,
        };
        let inner = Arc::clone(&self.inner);
        let node_id = NodeId::new();

        let old = self.inner().nodes.insert(node_id.clone(), node);
        assert!(old.is_none(), "node_id must be unique");

        AetherRadio::new(inner, node_id, rx, PhyPib::unspecified_new())
    }

    pub fn start_trace(&mut self, file: File) {
        self.inner().start_trace(file);
    }

    pub fn stop_trace(&mut self) -> File {
        self.inner().stop_trace()
    }

    /// Read back a trace as `(capture time, frame)` pairs.
    pub fn parse_trace(
        &mut self,
        file: File,
    ) -> impl Iterator<Item = (std::time::Duration, Frame<'static>)> {
        let mut reader = PcapNgReader::new(file).unwrap();

        std::iter::from_fn(move || {
            while let Some(block) = reader.next_block() {
                match block.unwrap() {
                    Block::InterfaceDescription(_) => continue,
                    Block::EnhancedPacket(packet) => {
                        let timestamp = packet.timestamp;
                        let (frame, _) = Frame::try_read(
                            packet.data.to_vec().leak(),
                            FooterMode::Explicit,
                        )
                        .expect("traced frames always parse");
                        return Some((timestamp, frame));
                    }
                    _ => continue,
                }
            }

            None
        })
    }

    fn inner(&self) -> MutexGuard<'_, AetherInner> {
        self.inner.lock().unwrap()
    }
}

pub(crate) struct AetherInner {
    nodes: HashMap<NodeId, Node>,
    /// Windows during which a carrier is on the air, per channel.
    transmissions: std::vec::Vec<Transmission>,
    pcap_trace: Option<(PcapNgWriter<File>, HashMap<NodeId, u32>)>,
    pub simulation_time: &'static SimulationTime,
}

impl Debug for AetherInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("AetherInner")
            .field("nodes", &self.nodes)
            .field("transmissions", &self.transmissions.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct Transmission {
    channel: u8,
    start: Instant,
    end: Instant,
}

impl AetherInner {
    fn start_trace(&mut self, file: File) {
        if self.pcap_trace.is_some() {
            panic!("Already capturing a trace");
        }

        self.pcap_trace = Some((PcapNgWriter::new(file).unwrap(), HashMap::new()));
    }

    /// Stops the trace and returns the file handle that was written to
    fn stop_trace(&mut self) -> File {
        let (trace, _) = self.pcap_trace.take().expect("No trace in progress");
        let mut file = trace.into_inner();
        file.flush().unwrap();
        file.seek(std::io::SeekFrom::Start(0)).unwrap();

        file
    }

    fn trace(&mut self, node_id: &NodeId, pkt: &AirPacket) {
        let Some((pcap, nodes)) = &mut self.pcap_trace else {
            return;
        };

        let len = nodes.len();
        let interface_id = *nodes.entry(node_id.clone()).or_insert_with(|| {
            pcap.write_pcapng_block(InterfaceDescriptionBlock {
                linktype: DataLink::IEEE802_15_4,
                snaplen: 127,
                options: vec![InterfaceDescriptionOption::IfName(
                    format!("{node_id:?}").into(),
                )],
            })
            .unwrap();

            len as u32
        });

        let block = EnhancedPacketBlock {
            interface_id,
            timestamp: into_std_duration(pkt.time_stamp.duration_since_epoch()),
            original_len: pkt.data.len().try_into().unwrap(),
            data: Cow::Borrowed(pkt.data.as_ref()),
            options: vec![],
        };
        pcap.write_pcapng_block(block).unwrap();
    }

    /// Mark a carrier on the air so that overlapping CCAs report busy.
    pub(crate) fn begin_transmission(&mut self, channel: u8, start: Instant, end: Instant) {
        let now = self.simulation_time.now();
        self.transmissions.retain(|t| t.end > now);
        self.transmissions.push(Transmission {
            channel,
            start,
            end,
        });
    }

    pub(crate) fn channel_busy(&self, channel: u8) -> bool {
        let now = self.simulation_time.now();
        self.transmissions
            .iter()
            .any(|t| t.channel == channel && t.start <= now && now < t.end)
    }

    pub(crate) fn send(&mut self, from: &NodeId, data: AirPacket) {
        self.trace(from, &data);

        let mut closed_radios = vec![];
        let from_pos = self.nodes.get(from).expect("sender always exists").position;

        for (to, node) in &self.nodes {
            if from == to || !node.rx_enable {
                continue;
            }

            let mut delayed_data = data.clone();
            let dist = node.position.dist(from_pos);
            delayed_data.time_stamp += dist.as_duration();

            match node.antenna.try_send(delayed_data) {
                Ok(()) => {}
                Err(TrySendError::Closed(_)) => closed_radios.push(to.clone()),
                Err(TrySendError::Full(_)) => {
                    log::warn!("Radio antenna of {to:?} is full")
                }
            }
        }

        for closed_radio in closed_radios {
            self.nodes.remove(&closed_radio);
        }
    }

    pub(crate) fn with_node<R>(&mut self, node_id: &NodeId, f: impl FnOnce(&mut Node) -> R) -> R {
        let node = self
            .nodes
            .get_mut(node_id)
            .expect("a radio always has a node");
        f(node)
    }
}

#[derive(Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Clone)]
pub struct NodeId(usize);

impl NodeId {
    fn new() -> Self {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) position: Coordinate,
    pub(crate) antenna: Sender<AirPacket>,
    pub(crate) rx_enable: bool,
}

#[derive(Debug, Clone)]
pub struct AirPacket {
    pub data: Vec<u8, 127>,
    /// The instant reception completes at the sender's position.
    pub time_stamp: Instant,
    pub channel: u8,
}
