//! The MLME-GET/MLME-SET surface: RIT attributes in the vendor range,
//! delegation for base attributes, and the start/stop side effect of the
//! period.

use rit_wpan_rs::{
    pib::PibValue,
    sap::{get::GetRequest, set::SetRequest, Status},
    time::Duration,
    wire::{PanId, ShortAddress},
};
use rit_wpan_rs_tests::run::{run_rit_network, NodeSetup};

#[test_log::test]
fn rit_attributes_roundtrip_through_the_mlme() {
    let (nodes, _aether, mut runner) =
        run_rit_network(&[NodeSetup::new(Default::default())]);

    runner.attach_test_task(async move {
        let commander = nodes[0].commander;

        // Base attributes delegate to the ordinary store
        let confirm = commander
            .request(SetRequest {
                pib_attribute: PibValue::MAC_SHORT_ADDRESS,
                pib_attribute_value: PibValue::MacShortAddress(ShortAddress(0x0042)),
            })
            .await;
        assert_eq!(confirm.status, Status::Success);

        let confirm = commander
            .request(SetRequest {
                pib_attribute: PibValue::MAC_PAN_ID,
                pib_attribute_value: PibValue::MacPanId(PanId(0x1234)),
            })
            .await;
        assert_eq!(confirm.status, Status::Success);

        let confirm = commander
            .request(GetRequest {
                pib_attribute: PibValue::MAC_SHORT_ADDRESS,
            })
            .await;
        assert_eq!(confirm.status, Status::Success);
        assert_eq!(
            confirm.value,
            PibValue::MacShortAddress(ShortAddress(0x0042))
        );

        // RIT time-based attribute roundtrip
        let confirm = commander
            .request(SetRequest {
                pib_attribute: PibValue::MAC_RIT_DATA_WAIT_DURATION_TIME,
                pib_attribute_value: PibValue::MacRitDataWaitDurationTime(Duration::from_millis(
                    25,
                )),
            })
            .await;
        assert_eq!(confirm.status, Status::Success);

        let confirm = commander
            .request(GetRequest {
                pib_attribute: PibValue::MAC_RIT_DATA_WAIT_DURATION_TIME,
            })
            .await;
        assert_eq!(
            confirm.value,
            PibValue::MacRitDataWaitDurationTime(Duration::from_millis(25))
        );

        // Legacy integer form exists in parallel
        let confirm = commander
            .request(SetRequest {
                pib_attribute: PibValue::MAC_RIT_DATA_WAIT_DURATION,
                pib_attribute_value: PibValue::MacRitDataWaitDuration(3),
            })
            .await;
        assert_eq!(confirm.status, Status::Success);

        // Value of the wrong shape
        let confirm = commander
            .request(SetRequest {
                pib_attribute: PibValue::MAC_RIT_PERIOD_TIME,
                pib_attribute_value: PibValue::MacRitPeriod(5),
            })
            .await;
        assert_eq!(confirm.status, Status::InvalidParameter);

        // Unknown attributes are refused on both paths
        let confirm = commander
            .request(GetRequest {
                pib_attribute: "macNoSuchAttribute",
            })
            .await;
        assert_eq!(confirm.status, Status::UnsupportedAttribute);

        let confirm = commander
            .request(SetRequest {
                pib_attribute: "macRitNoSuchAttribute",
                pib_attribute_value: PibValue::None,
            })
            .await;
        assert_eq!(confirm.status, Status::UnsupportedAttribute);

        // Setting a positive period starts the cycle, zero stops it again
        let confirm = commander
            .request(SetRequest {
                pib_attribute: PibValue::MAC_RIT_PERIOD_TIME,
                pib_attribute_value: PibValue::MacRitPeriodTime(Duration::from_millis(100)),
            })
            .await;
        assert_eq!(confirm.status, Status::Success);

        let confirm = commander
            .request(SetRequest {
                pib_attribute: PibValue::MAC_RIT_PERIOD_TIME,
                pib_attribute_value: PibValue::MacRitPeriodTime(Duration::ZERO),
            })
            .await;
        assert_eq!(confirm.status, Status::Success);

        // A period below the data wait window is a configuration error
        let confirm = commander
            .request(SetRequest {
                pib_attribute: PibValue::MAC_RIT_PERIOD_TIME,
                pib_attribute_value: PibValue::MacRitPeriodTime(Duration::from_millis(1)),
            })
            .await;
        assert_eq!(confirm.status, Status::InvalidParameter);

        // PHY attributes resolve through the same surface
        let confirm = commander
            .request(GetRequest {
                pib_attribute: PibValue::PHY_CURRENT_CHANNEL,
            })
            .await;
        assert_eq!(confirm.status, Status::Success);
        assert_eq!(confirm.value, PibValue::PhyCurrentChannel(11));
    });

    runner.run();
}
