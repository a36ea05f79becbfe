//! Baseline without RIT: with the period at zero the MAC transmits queued
//! frames immediately, so a periodic application sees its own cadence on the
//! receiver side.

use rit_wpan_rs::{
    device::{configure_device, DeviceConfig, RitWpanDevice},
    time::{Duration, Instant},
    wire::{PanId, ShortAddress},
    DeviceAddress,
};
use rit_wpan_rs_tests::run::{run_rit_network, NodeSetup};

#[test_log::test]
fn periodic_application_eight_packet_delivery() {
    let receiver_config = DeviceConfig {
        short_addr: ShortAddress(0x0000),
        pan_id: PanId(0x1234),
        rank: 0,
        rit_period: Duration::ZERO,
        ..Default::default()
    };
    let sender_config = DeviceConfig {
        short_addr: ShortAddress(0x0001),
        pan_id: PanId(0x1234),
        rank: 1,
        rit_period: Duration::ZERO,
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

        let mut arrivals = Vec::new();
        for i in 0..8u64 {
            time.delay_until(Instant::from_seconds(2 + i)).await;
            assert!(sender.send(&[0x55; 8], DeviceAddress::Short(ShortAddress(0x0000)), 0));

            let received = receiver.receive().await;
            assert_eq!(received.payload.len(), 8);
            assert_eq!(received.src, ShortAddress(0x0001));
            arrivals.push(time.now());
        }

        time.delay_until(Instant::from_seconds(10) + Duration::from_millis(100))
            .await;

        assert_eq!(receiver.counters().rx(), 8);
        for pair in arrivals.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            let error = (gap - Duration::from_seconds(1)).abs();
            assert!(error <= Duration::from_millis(10), "inter-arrival gap {gap}");
        }
    });

    runner.run();
}
