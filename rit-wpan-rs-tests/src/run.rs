//! The deterministic single-threaded runner: node tasks plus test tasks on
//! one executor, with virtual time advanced only when nothing can run.

use std::future::Future;

use async_executor::{Executor, Task};
use log::trace;
use rand::{rngs::StdRng, SeedableRng};
use rit_wpan_rs::{
    device::DeviceConfig,
    mac::{MacCommander, MacConfig},
    nwk::{NwkConfig, NwkHandle},
    time::{Duration, Instant},
    wire::ExtendedAddress,
};

use crate::{
    aether::Aether,
    time::{Delay, SimulationTime},
};

/// Virtual-time ceiling: a scenario that is still ticking past this point is
/// considered runaway.
const TIME_LIMIT: Instant = Instant::from_seconds(1000);

/// One node in the simulated network.
#[derive(Debug, Clone)]
pub struct NodeSetup {
    pub device: DeviceConfig,
    /// Forwarding-layer retransmissions after NO_ACK.
    pub max_retries: u8,
    /// Upper bound of the randomized retransmission delay.
    pub retry_delay_max: Duration,
}

impl NodeSetup {
    pub fn new(device: DeviceConfig) -> Self {
        Self {
            device,
            max_retries: 0,
            retry_delay_max: Duration::from_seconds(5),
        }
    }
}

/// The handles a test drives one node through.
#[derive(Clone, Copy)]
pub struct NodeHandles {
    pub commander: &'static MacCommander,
    pub nwk: &'static NwkHandle,
}

/// Spin up a network of RIT nodes: per node one MAC engine and one rank
/// forwarding task, all connected through a fresh aether.
///
/// The returned handles are not yet configured; tests apply their
/// [DeviceConfig] through [rit_wpan_rs::device::configure_device] inside a
/// test task.
pub fn run_rit_network<'a>(setups: &[NodeSetup]) -> (Vec<NodeHandles>, Aether, MultiRunner<'a>) {
    let simulation_time = Box::leak(Box::new(SimulationTime::new())) as &'static SimulationTime;

    let mut aether = Aether::new(simulation_time);
    let executor = Executor::new();

    let mut handles = Vec::new();
    let mut engine_handles = Vec::new();

    for (i, setup) in setups.iter().enumerate() {
        let commander = Box::leak(Box::new(MacCommander::new())) as &'static MacCommander;
        let nwk = Box::leak(Box::new(NwkHandle::new())) as &'static NwkHandle;

        let radio = aether.radio();
        engine_handles.push(executor.spawn(async move {
            rit_wpan_rs::mac::run_mac_engine(
                radio,
                commander,
                MacConfig {
                    extended_address: ExtendedAddress(i as u64),
                    run_id: 1,
                    continuous_tx_timeout: Duration::from_millis(10),
                    rng: StdRng::seed_from_u64(i as u64),
                    delay: Delay(simulation_time),
                },
            )
            .await
        }));

        let nwk_config = NwkConfig {
            rank: setup.device.rank,
            short_addr: setup.device.short_addr,
            pan_id: setup.device.pan_id,
            max_retries: setup.max_retries,
            retry_delay_max: setup.retry_delay_max,
            rng: StdRng::seed_from_u64(0x4000 + i as u64),
            delay: Delay(simulation_time),
        };
        engine_handles.push(executor.spawn(async move {
            rit_wpan_rs::nwk::run_nwk(commander, nwk, nwk_config).await
        }));

        handles.push(NodeHandles { commander, nwk });
    }

    (
        handles,
        aether,
        MultiRunner {
            executor,
            engine_handles,
            task_handles: Vec::new(),
            simulation_time,
        },
    )
}

pub struct MultiRunner<'a> {
    executor: Executor<'a>,
    engine_handles: Vec<Task<()>>,
    task_handles: Vec<Task<()>>,
    pub simulation_time: &'static SimulationTime,
}

impl<'a> MultiRunner<'a> {
    pub fn attach_test_task(&mut self, f: impl Future<Output = ()> + Send + 'a) {
        self.task_handles.push(self.executor.spawn(f));
    }

    /// Drive everything until all test tasks finish. Panics from any task
    /// propagate.
    pub fn run(mut self) {
        loop {
            if !self.executor.try_tick() {
                trace!("Ticking time along...");
                assert!(
                    self.simulation_time.tick(),
                    "deadlock: no task is runnable and no deadline is pending"
                );
                assert!(
                    self.simulation_time.now() < TIME_LIMIT,
                    "runaway simulation: the virtual clock passed {TIME_LIMIT:?}"
                );
            }

            for i in (0..self.engine_handles.len()).rev() {
                if self.engine_handles[i].is_finished() {
                    // Check to see if it produced a result (and thus didn't panic)
                    futures::executor::block_on(self.engine_handles.remove(i).cancel());
                }
            }

            for i in (0..self.task_handles.len()).rev() {
                if self.task_handles[i].is_finished() {
                    // Check to see if it produced a result (and thus didn't panic)
                    futures::executor::block_on(self.task_handles.remove(i).cancel());
                }
            }

            if self.task_handles.is_empty() {
                // We're done
                break;
            }
        }
    }
}
