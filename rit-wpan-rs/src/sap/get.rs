//! MLME-GET.request / confirm.

use super::{Request, Status};
use crate::pib::PibValue;

#[derive(Debug, Clone)]
pub struct GetRequest {
    pub pib_attribute: &'static str,
}

impl Request for GetRequest {
    type Confirm = GetConfirm;
}

#[derive(Debug, Clone)]
pub struct GetConfirm {
    pub status: Status,
    pub pib_attribute: &'static str,
    pub value: PibValue,
}
