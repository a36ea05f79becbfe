//! The MCPS/MLME service access points the upper layers drive the MAC
//! through.

use data::{DataConfirm, DataIndication, DataRequest};
use get::{GetConfirm, GetRequest};
use reset::{ResetConfirm, ResetRequest};
use rit::{RitModuleConfigConfirm, RitModuleConfigRequest, RitRequestIndication, RitRequestResponse};
use set::{SetConfirm, SetRequest};

pub mod data;
pub mod get;
pub mod reset;
pub mod rit;
pub mod set;

/// The status codes reported on the confirm primitives.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Status {
    #[default]
    Success,
    NoAck,
    ChannelAccessFailure,
    FrameTooLong,
    InvalidAddress,
    InvalidParameter,
    UnsupportedAttribute,
    TransactionOverflow,
    TransactionExpired,
    ReadOnly,
    PhyError,
}

#[allow(private_bounds)]
pub trait Request: From<RequestValue> + Into<RequestValue> {
    type Confirm: From<ConfirmValue> + Into<ConfirmValue>;
}

pub(crate) enum RequestValue {
    Data(DataRequest),
    Get(GetRequest),
    Set(SetRequest),
    Reset(ResetRequest),
    RitModuleConfig(RitModuleConfigRequest),
}

impl From<DataRequest> for RequestValue {
    fn from(v: DataRequest) -> Self {
        Self::Data(v)
    }
}

impl From<GetRequest> for RequestValue {
    fn from(v: GetRequest) -> Self {
        Self::Get(v)
    }
}

impl From<SetRequest> for RequestValue {
    fn from(v: SetRequest) -> Self {
        Self::Set(v)
    }
}

impl From<ResetRequest> for RequestValue {
    fn from(v: ResetRequest) -> Self {
        Self::Reset(v)
    }
}

impl From<RitModuleConfigRequest> for RequestValue {
    fn from(v: RitModuleConfigRequest) -> Self {
        Self::RitModuleConfig(v)
    }
}

impl From<RequestValue> for DataRequest {
    fn from(value: RequestValue) -> Self {
        match value {
            RequestValue::Data(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

impl From<RequestValue> for GetRequest {
    fn from(value: RequestValue) -> Self {
        match value {
            RequestValue::Get(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

impl From<RequestValue> for SetRequest {
    fn from(value: RequestValue) -> Self {
        match value {
            RequestValue::Set(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

impl From<RequestValue> for ResetRequest {
    fn from(value: RequestValue) -> Self {
        match value {
            RequestValue::Reset(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

impl From<RequestValue> for RitModuleConfigRequest {
    fn from(value: RequestValue) -> Self {
        match value {
            RequestValue::RitModuleConfig(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

pub(crate) enum ConfirmValue {
    Data(DataConfirm),
    Get(GetConfirm),
    Set(SetConfirm),
    Reset(ResetConfirm),
    RitModuleConfig(RitModuleConfigConfirm),
    None,
}

impl From<DataConfirm> for ConfirmValue {
    fn from(v: DataConfirm) -> Self {
        Self::Data(v)
    }
}

impl From<GetConfirm> for ConfirmValue {
    fn from(v: GetConfirm) -> Self {
        Self::Get(v)
    }
}

impl From<SetConfirm> for ConfirmValue {
    fn from(v: SetConfirm) -> Self {
        Self::Set(v)
    }
}

impl From<ResetConfirm> for ConfirmValue {
    fn from(v: ResetConfirm) -> Self {
        Self::Reset(v)
    }
}

impl From<RitModuleConfigConfirm> for ConfirmValue {
    fn from(v: RitModuleConfigConfirm) -> Self {
        Self::RitModuleConfig(v)
    }
}

impl From<()> for ConfirmValue {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl From<ConfirmValue> for DataConfirm {
    fn from(value: ConfirmValue) -> Self {
        match value {
            ConfirmValue::Data(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

impl From<ConfirmValue> for GetConfirm {
    fn from(value: ConfirmValue) -> Self {
        match value {
            ConfirmValue::Get(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

impl From<ConfirmValue> for SetConfirm {
    fn from(value: ConfirmValue) -> Self {
        match value {
            ConfirmValue::Set(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

impl From<ConfirmValue> for ResetConfirm {
    fn from(value: ConfirmValue) -> Self {
        match value {
            ConfirmValue::Reset(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

impl From<ConfirmValue> for RitModuleConfigConfirm {
    fn from(value: ConfirmValue) -> Self {
        match value {
            ConfirmValue::RitModuleConfig(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

impl From<ConfirmValue> for () {
    fn from(v: ConfirmValue) -> Self {
        match v {
            ConfirmValue::None => (),
            _ => panic!("Bad cast"),
        }
    }
}

#[allow(private_bounds)]
pub trait Indication: From<IndicationValue> + Into<IndicationValue> {
    type Response: From<ResponseValue> + Into<ResponseValue>;
}

pub enum IndicationValue {
    Data(DataIndication),
    RitRequest(RitRequestIndication),
}

impl From<DataIndication> for IndicationValue {
    fn from(v: DataIndication) -> Self {
        Self::Data(v)
    }
}

impl From<RitRequestIndication> for IndicationValue {
    fn from(v: RitRequestIndication) -> Self {
        Self::RitRequest(v)
    }
}

impl From<IndicationValue> for DataIndication {
    fn from(value: IndicationValue) -> Self {
        match value {
            IndicationValue::Data(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

impl From<IndicationValue> for RitRequestIndication {
    fn from(value: IndicationValue) -> Self {
        match value {
            IndicationValue::RitRequest(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

pub(crate) enum ResponseValue {
    RitRequest(RitRequestResponse),
    None,
}

impl From<RitRequestResponse> for ResponseValue {
    fn from(v: RitRequestResponse) -> Self {
        Self::RitRequest(v)
    }
}

impl From<ResponseValue> for RitRequestResponse {
    fn from(value: ResponseValue) -> Self {
        match value {
            ResponseValue::RitRequest(v) => v,
            _ => panic!("Bad cast"),
        }
    }
}

impl From<()> for ResponseValue {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl From<ResponseValue> for () {
    fn from(v: ResponseValue) -> Self {
        match v {
            ResponseValue::None => (),
            _ => panic!("Bad cast"),
        }
    }
}
