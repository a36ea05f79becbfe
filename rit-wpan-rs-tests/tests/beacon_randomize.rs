//! With beacon randomization, every interval is drawn independently from
//! [0.5, 1.5] times the drift-adjusted period; the mean stays on the nominal
//! period.

use std::fs::OpenOptions;

use rit_wpan_rs::{
    device::{configure_device, DeviceConfig},
    mac::ModuleConfig,
    time::{Duration, Instant},
    wire::{FrameType, PanId, ShortAddress},
};
use rit_wpan_rs_tests::run::{run_rit_network, NodeSetup};

#[test_log::test]
fn randomized_beacon_intervals_stay_in_bounds() {
    let device = DeviceConfig {
        short_addr: ShortAddress(0x0000),
        pan_id: PanId(0x1234),
        rank: 0,
        rit_period: Duration::from_millis(5),
        rit_data_wait: Duration::from_millis(1),
        module_config: ModuleConfig {
            beacon_randomize: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let (nodes, mut aether, mut runner) = run_rit_network(&[NodeSetup::new(device.clone())]);
    let time = runner.simulation_time;

    let trace_path = std::env::temp_dir().join("rit_wpan_beacon_randomize.pcap");
    aether.start_trace(
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&trace_path)
            .unwrap(),
    );

    runner.attach_test_task(async move {
        configure_device(nodes[0].commander, &device).await.unwrap();

        // Even with every interval at the upper bound this spans over a
        // thousand periods
        time.delay_until(Instant::from_seconds(8)).await;
    });

    runner.run();

    let trace = aether.stop_trace();
    let beacon_times: Vec<f64> = aether
        .parse_trace(trace)
        .filter(|(_, frame)| frame.header.frame_type == FrameType::MacCommand)
        .map(|(at, _)| at.as_secs_f64())
        .collect();

    assert!(
        beacon_times.len() >= 1000,
        "expected over a thousand beacons, got {}",
        beacon_times.len()
    );

    let nominal = 5.0e-3;
    // Clock skew is bounded by 250 ppm and the random-walk noise is in the
    // microseconds at this scale
    let slack = 50.0e-6;

    let mut sum = 0.0;
    for pair in beacon_times.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            (0.5 * nominal - slack..=1.5 * nominal + slack).contains(&gap),
            "interval {gap} outside the randomization bounds"
        );
        sum += gap;
    }

    let mean = sum / (beacon_times.len() - 1) as f64;
    assert!(
        (mean - nominal).abs() < nominal * 0.05,
        "mean interval {mean} strays from the nominal period"
    );
}
