use rand_core::RngCore;

use crate::{
    phy::Phy,
    pib::{MacPib, PibValue},
    sap::{
        set::{SetConfirm, SetRequest},
        Status,
    },
    time::DelayNsExt,
};

use super::{commander::RequestResponder, rit, state::MacState, MacConfig};

pub async fn process_set_request<'a, Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'a>,
    config: &mut MacConfig<Rng, Delay>,
    responder: RequestResponder<'a, SetRequest>,
) {
    let pib_attribute = responder.request.pib_attribute;
    let value = responder.request.pib_attribute_value.clone();

    let status = if PibValue::is_rit_attribute(pib_attribute) {
        set_rit_attribute(phy, mac_pib, mac_state, config, pib_attribute, value).await
    } else {
        set_base_attribute(phy, mac_pib, pib_attribute, &value).await
    };

    responder.respond(SetConfirm {
        status,
        pib_attribute,
    });
}

async fn set_base_attribute(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    attribute: &'static str,
    value: &PibValue,
) -> Status {
    let phy_result = phy.update_phy_pib(|phy_pib| phy_pib.try_set(attribute, value)).await;

    match phy_result {
        Err(_) => Status::PhyError,
        Ok(Some(status)) => status,
        Ok(None) => mac_pib
            .try_set(attribute, value)
            .unwrap_or(Status::UnsupportedAttribute),
    }
}

/// The RIT attribute range carries cycle start/stop side effects: setting the
/// period (in either representation) to zero stops the cycle, and a positive
/// value starts it when the MAC is currently disabled.
async fn set_rit_attribute<Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'_>,
    config: &mut MacConfig<Rng, Delay>,
    attribute: &'static str,
    value: PibValue,
) -> Status {
    match (attribute, value) {
        (PibValue::MAC_RIT_PERIOD, PibValue::MacRitPeriod(period)) => {
            mac_pib.rit.period = period;
            apply_period_change(phy, mac_pib, mac_state, config).await
        }
        (PibValue::MAC_RIT_PERIOD_TIME, PibValue::MacRitPeriodTime(period_time)) => {
            mac_pib.rit.period_time = period_time;
            apply_period_change(phy, mac_pib, mac_state, config).await
        }
        (PibValue::MAC_RIT_DATA_WAIT_DURATION, PibValue::MacRitDataWaitDuration(duration)) => {
            mac_pib.rit.data_wait_duration = duration;
            Status::Success
        }
        (PibValue::MAC_RIT_TX_WAIT_DURATION, PibValue::MacRitTxWaitDuration(duration)) => {
            mac_pib.rit.tx_wait_duration = duration;
            Status::Success
        }
        (
            PibValue::MAC_RIT_DATA_WAIT_DURATION_TIME,
            PibValue::MacRitDataWaitDurationTime(duration),
        ) => {
            mac_pib.rit.data_wait_duration_time = duration;
            Status::Success
        }
        (
            PibValue::MAC_RIT_TX_WAIT_DURATION_TIME,
            PibValue::MacRitTxWaitDurationTime(duration),
        ) => {
            mac_pib.rit.tx_wait_duration_time = duration;
            Status::Success
        }
        (PibValue::MAC_RIT_REQUEST_PAYLOAD, PibValue::MacRitRequestPayload(payload)) => {
            mac_pib.rit.request_payload = payload;
            Status::Success
        }
        (
            PibValue::MAC_RIT_PERIOD
            | PibValue::MAC_RIT_PERIOD_TIME
            | PibValue::MAC_RIT_DATA_WAIT_DURATION
            | PibValue::MAC_RIT_TX_WAIT_DURATION
            | PibValue::MAC_RIT_DATA_WAIT_DURATION_TIME
            | PibValue::MAC_RIT_TX_WAIT_DURATION_TIME
            | PibValue::MAC_RIT_REQUEST_PAYLOAD,
            _,
        ) => Status::InvalidParameter,
        _ => Status::UnsupportedAttribute,
    }
}

async fn apply_period_change<Rng: RngCore, Delay: DelayNsExt>(
    phy: &mut impl Phy,
    mac_pib: &mut MacPib,
    mac_state: &mut MacState<'_>,
    config: &mut MacConfig<Rng, Delay>,
) -> Status {
    use super::state::RitMode;

    if !mac_pib.is_rit_enabled() {
        debug!("RIT period set to zero, stopping the RIT cycle");
        rit::stop_rit_cycle(mac_state);
        Status::Success
    } else if mac_state.rit_mode == RitMode::Disabled {
        rit::start_rit_cycle(phy, mac_pib, mac_state, config).await
    } else {
        Status::Success
    }
}
