//! Two nodes, one RIT hop: a rank-1 sender delivers three packets to a
//! rank-0 receiver that keeps its radio on.

use rit_wpan_rs::{
    device::{configure_device, DeviceConfig, RitWpanDevice},
    time::{Duration, Instant},
    wire::{PanId, ShortAddress},
    DeviceAddress,
};
use rit_wpan_rs_tests::run::{run_rit_network, NodeSetup};

#[test_log::test]
fn two_node_three_packet_delivery() {
    let receiver_config = DeviceConfig {
        short_addr: ShortAddress(0x0000),
        pan_id: PanId(0x1234),
        rank: 0,
        rit_period: Duration::from_seconds(1),
        rx_always_on: true,
        ..Default::default()
    };
    let sender_config = DeviceConfig {
        short_addr: ShortAddress(0x0001),
        pan_id: PanId(0x1234),
        rank: 1,
        rit_period: Duration::from_seconds(1),
        ..Default::default()
    };

    let (nodes, _aether, mut runner) = run_rit_network(&[
        NodeSetup::new(receiver_config.clone()),
        NodeSetup::new(sender_config.clone()),
    ]);
    let time = runner.simulation_time;

    runner.attach_test_task(async move {
        configure_device(nodes[0].commander, &receiver_config)
            .await
            .unwrap();
        configure_device(nodes[1].commander, &sender_config)
            .await
            .unwrap();

        let receiver = RitWpanDevice::new(nodes[0].commander, nodes[0].nwk);
        let sender = RitWpanDevice::new(nodes[1].commander, nodes[1].nwk);

        for (at, size) in [(8, 30usize), (12, 60), (16, 90)] {
            time.delay_until(Instant::from_seconds(at)).await;
            assert!(sender.send(&vec![0xA5; size], DeviceAddress::Short(ShortAddress(0x0000)), 0));
        }

        let mut sizes = Vec::new();
        for _ in 0..3 {
            let received = receiver.receive().await;
            assert_eq!(received.src, ShortAddress(0x0001));
            sizes.push(received.payload.len());
        }
        assert_eq!(sizes, [30, 60, 90]);

        time.delay_until(Instant::from_seconds(20)).await;
        assert_eq!(receiver.counters().rx(), 3);
        assert_eq!(sender.counters().tx_ok(), 3);
        assert_eq!(sender.counters().tx_drop(), 0);
    });

    runner.run();
}
