//! Three nodes in a chain: the leaf's packet climbs the tree one rank at a
//! time, with the relay rebuilding the network header.

use rit_wpan_rs::{
    device::{configure_device, DeviceConfig, RitWpanDevice},
    time::{Duration, Instant},
    wire::{PanId, ShortAddress},
    DeviceAddress,
};
use rit_wpan_rs_tests::run::{run_rit_network, NodeSetup};

#[test_log::test]
fn leaf_to_parent_over_one_relay() {
    let parent_config = DeviceConfig {
        short_addr: ShortAddress(0x0000),
        pan_id: PanId(0x1234),
        rank: 0,
        rit_period: Duration::from_seconds(1),
        rx_always_on: true,
        ..Default::default()
    };
    let relay_config = DeviceConfig {
        short_addr: ShortAddress(0x0001),
        pan_id: PanId(0x1234),
        rank: 1,
        rit_period: Duration::from_seconds(1),
        ..Default::default()
    };
    let leaf_config = DeviceConfig {
        short_addr: ShortAddress(0x0002),
        pan_id: PanId(0x1234),
        rank: 2,
        rit_period: Duration::from_seconds(1),
        ..Default::default()
    };

    let (nodes, _aether, mut runner) = run_rit_network(&[
        NodeSetup::new(parent_config.clone()),
        NodeSetup::new(relay_config.clone()),
        NodeSetup::new(leaf_config.clone()),
    ]);
    let time = runner.simulation_time;

    runner.attach_test_task(async move {
        configure_device(nodes[0].commander, &parent_config)
            .await
            .unwrap();
        configure_device(nodes[1].commander, &relay_config)
            .await
            .unwrap();
        configure_device(nodes[2].commander, &leaf_config)
            .await
            .unwrap();

        let parent = RitWpanDevice::new(nodes[0].commander, nodes[0].nwk);
        let relay = RitWpanDevice::new(nodes[1].commander, nodes[1].nwk);
        let leaf = RitWpanDevice::new(nodes[2].commander, nodes[2].nwk);

        time.delay_until(Instant::from_seconds(2)).await;
        assert!(leaf.send(&[0x42; 40], DeviceAddress::Short(ShortAddress(0x0000)), 0));

        let received = parent.receive().await;
        assert_eq!(received.payload.len(), 40);
        assert!(received.payload.iter().all(|b| *b == 0x42));
        // The header is rebuilt at the relay, so the parent sees the relay
        // as the network-layer source
        assert_eq!(received.src, ShortAddress(0x0001));

        assert_eq!(relay.counters().rx(), 1, "relay accepted the frame for forwarding");
        assert_eq!(relay.counters().tx_ok(), 1, "relay delivered it upward");
        assert_eq!(parent.counters().rx(), 1);
        assert_eq!(leaf.counters().tx_ok(), 1);
        assert_eq!(parent.counters().rx_drop(), 0);
    });

    runner.run();
}
