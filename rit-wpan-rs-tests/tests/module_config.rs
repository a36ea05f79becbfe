//! The carrier-sense selections within a family are mutually exclusive; a
//! conflicting configuration must be rejected before any event runs.

use rit_wpan_rs::{
    device::{configure_device, ConfigError, DeviceConfig},
    mac::{ModuleConfig, ModuleConfigError},
    sap::{rit::RitModuleConfigRequest, Status},
    wire::{PanId, ShortAddress},
};
use rit_wpan_rs_tests::run::{run_rit_network, NodeSetup};

#[test]
fn validation_rejects_conflicting_families() {
    let conflicting_data = ModuleConfig {
        data_csma: true,
        data_precs: true,
        ..Default::default()
    };
    assert_eq!(
        conflicting_data.validate(),
        Err(ModuleConfigError::DataChannelAccessConflict)
    );

    let conflicting_beacon = ModuleConfig {
        beacon_precs: true,
        beacon_precsb: true,
        ..Default::default()
    };
    assert_eq!(
        conflicting_beacon.validate(),
        Err(ModuleConfigError::BeaconChannelAccessConflict)
    );

    // One selection per family is fine
    let valid = ModuleConfig {
        data_precs: true,
        beacon_csma: true,
        ..Default::default()
    };
    assert_eq!(valid.validate(), Ok(()));
}

#[test_log::test]
fn install_rejects_conflicting_config_before_any_event() {
    let device = DeviceConfig {
        short_addr: ShortAddress(0x0000),
        pan_id: PanId(0x1234),
        module_config: ModuleConfig {
            data_csma: true,
            data_precs: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let (nodes, _aether, mut runner) = run_rit_network(&[NodeSetup::new(device.clone())]);

    runner.attach_test_task(async move {
        let result = configure_device(nodes[0].commander, &device).await;
        assert_eq!(
            result,
            Err(ConfigError::ModuleConfig(
                ModuleConfigError::DataChannelAccessConflict
            ))
        );

        // The MAC itself also refuses the record
        let confirm = nodes[0]
            .commander
            .request(RitModuleConfigRequest {
                config: device.module_config,
                rx_always_on: false,
            })
            .await;
        assert_eq!(confirm.status, Status::InvalidParameter);
    });

    runner.run();
}
