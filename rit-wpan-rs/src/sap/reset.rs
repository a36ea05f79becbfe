//! MLME-RESET.request / confirm.

use super::{Request, Status};

#[derive(Debug, Clone, Copy)]
pub struct ResetRequest {
    pub set_default_pib: bool,
}

impl Request for ResetRequest {
    type Confirm = ResetConfirm;
}

#[derive(Debug, Clone, Copy)]
pub struct ResetConfirm {
    pub status: Status,
}
