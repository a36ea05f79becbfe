//! An acknowledged frame toward a node that does not exist: the MAC reports
//! NO_ACK, the forwarding layer retries with randomized delays, then drops.

use rit_wpan_rs::{
    device::{configure_device, DeviceConfig, RitWpanDevice},
    time::{Duration, Instant},
    wire::{PanId, ShortAddress},
    DeviceAddress,
};
use rit_wpan_rs_tests::run::{run_rit_network, NodeSetup};

#[test_log::test]
fn no_ack_is_retried_then_dropped() {
    let device = DeviceConfig {
        short_addr: ShortAddress(0x0000),
        pan_id: PanId(0x1234),
        rank: 0,
        rit_period: Duration::ZERO,
        ..Default::default()
    };

    let mut setup = NodeSetup::new(device.clone());
    setup.max_retries = 2;

    let (nodes, _aether, mut runner) = run_rit_network(&[setup]);
    let time = runner.simulation_time;

    runner.attach_test_task(async move {
        configure_device(nodes[0].commander, &device).await.unwrap();

        let sender = RitWpanDevice::new(nodes[0].commander, nodes[0].nwk);
        assert!(sender.send(&[1, 2, 3, 4], DeviceAddress::Short(ShortAddress(0x0002)), 0));

        // Three attempts with up to five seconds of settle delay between them
        time.delay_until(Instant::from_seconds(20)).await;

        let counters = sender.counters();
        assert_eq!(counters.tx(), 3, "one initial attempt plus two retries");
        assert_eq!(counters.retx(), 2);
        assert_eq!(counters.tx_drop(), 1);
        assert_eq!(counters.tx_ok(), 0);
    });

    runner.run();
}
