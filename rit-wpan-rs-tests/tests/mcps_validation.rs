//! MCPS-DATA.request parameter validation and the broadcast ACK rule.

use rit_wpan_rs::{
    device::{configure_device, DeviceConfig},
    sap::{
        data::{DataRequest, MacPayload, TxOptions},
        Status,
    },
    time::Duration,
    wire::{AddressingMode, ExtendedAddress, PanId, ShortAddress},
};
use rit_wpan_rs_tests::run::{run_rit_network, NodeSetup};

fn data_request(msdu: MacPayload) -> DataRequest {
    DataRequest {
        src_addr_mode: AddressingMode::Short,
        dst_addr_mode: AddressingMode::Short,
        dst_pan_id: PanId(0x1234),
        dst_addr: ShortAddress(0x0002),
        dst_ext_addr: ExtendedAddress::BROADCAST,
        msdu_handle: 1,
        tx_options: TxOptions::acknowledged(),
        msdu,
    }
}

#[test_log::test]
fn data_request_validation() {
    let device = DeviceConfig {
        short_addr: ShortAddress(0x0000),
        pan_id: PanId(0x1234),
        rit_period: Duration::ZERO,
        ..Default::default()
    };

    let (nodes, _aether, mut runner) = run_rit_network(&[NodeSetup::new(device.clone())]);

    runner.attach_test_task(async move {
        configure_device(nodes[0].commander, &device).await.unwrap();
        let commander = nodes[0].commander;

        // One octet past the MPDU capacity
        let mut oversize = MacPayload::new();
        oversize.resize_default(119).unwrap();
        let confirm = commander.request(data_request(oversize)).await;
        assert_eq!(confirm.status, Status::FrameTooLong);
        assert_eq!(confirm.msdu_handle, 1);

        // No address at all
        let mut request = data_request(MacPayload::from_slice(&[1, 2, 3]).unwrap());
        request.src_addr_mode = AddressingMode::None;
        request.dst_addr_mode = AddressingMode::None;
        let confirm = commander.request(request).await;
        assert_eq!(confirm.status, Status::InvalidAddress);

        // Reserved addressing mode
        let mut request = data_request(MacPayload::from_slice(&[1, 2, 3]).unwrap());
        request.dst_addr_mode = AddressingMode::Reserved;
        let confirm = commander.request(request).await;
        assert_eq!(confirm.status, Status::InvalidAddress);

        // GTS and indirect transmission are unsupported
        let mut request = data_request(MacPayload::from_slice(&[1, 2, 3]).unwrap());
        request.tx_options.gts = true;
        let confirm = commander.request(request).await;
        assert_eq!(confirm.status, Status::InvalidParameter);

        let mut request = data_request(MacPayload::from_slice(&[1, 2, 3]).unwrap());
        request.tx_options.indirect = true;
        let confirm = commander.request(request).await;
        assert_eq!(confirm.status, Status::InvalidParameter);

        // An ACK request on a broadcast destination is silently cleared: the
        // frame goes out unacknowledged and confirms success immediately
        let mut request = data_request(MacPayload::from_slice(&[9, 9]).unwrap());
        request.dst_addr = ShortAddress::BROADCAST;
        let confirm = commander.request(request).await;
        assert_eq!(confirm.status, Status::Success);
    });

    runner.run();
}
