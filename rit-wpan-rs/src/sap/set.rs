//! MLME-SET.request / confirm.

use super::{Request, Status};
use crate::pib::PibValue;

#[derive(Debug, Clone)]
pub struct SetRequest {
    pub pib_attribute: &'static str,
    pub pib_attribute_value: PibValue,
}

impl Request for SetRequest {
    type Confirm = SetConfirm;
}

#[derive(Debug, Clone)]
pub struct SetConfirm {
    pub status: Status,
    pub pib_attribute: &'static str,
}
