use crate::{
    phy::Phy,
    pib::{MacPib, PibValue},
    sap::{
        get::{GetConfirm, GetRequest},
        Status,
    },
};

use super::commander::RequestResponder;

pub async fn process_get_request(
    phy: &mut impl Phy,
    mac_pib: &MacPib,
    responder: RequestResponder<'_, GetRequest>,
) {
    let pib_attribute = responder.request.pib_attribute;

    let value = phy
        .get_phy_pib()
        .get(pib_attribute)
        .or_else(|| mac_pib.get(pib_attribute));

    match value {
        Some(value) => responder.respond(GetConfirm {
            status: Status::Success,
            pib_attribute,
            value,
        }),
        None => responder.respond(GetConfirm {
            status: Status::UnsupportedAttribute,
            pib_attribute,
            value: PibValue::None,
        }),
    }
}
