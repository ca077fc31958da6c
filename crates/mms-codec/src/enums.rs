//! Enumerated value tables for the wire format.

use crate::error::{DecodeError, DecodeResult};

/// WSP/MMS boolean encoding: Yes=128, No=129.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WapBool {
    Yes,
    No,
}

impl WapBool {
    pub fn to_wire(self) -> u8 {
        match self {
            WapBool::Yes => 128,
            WapBool::No => 129,
        }
    }

    pub fn from_wire(v: u8) -> DecodeResult<Self> {
        match v {
            128 => Ok(WapBool::Yes),
            129 => Ok(WapBool::No),
            _ => Err(DecodeError::MalformedExpiry),
        }
    }

    pub fn as_bool(self) -> bool {
        matches!(self, WapBool::Yes)
    }

    pub fn from_bool(b: bool) -> Self {
        if b {
            WapBool::Yes
        } else {
            WapBool::No
        }
    }
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $repr:ty {
            $( $variant:ident = $value:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $( $variant ),+
        }

        impl $name {
            pub fn to_wire(self) -> $repr {
                match self {
                    $( $name::$variant => $value ),+
                }
            }

            pub fn from_wire(v: $repr) -> DecodeResult<Self> {
                match v {
                    $( $value => Ok($name::$variant), )+
                    _ => Err(DecodeError::InvalidEnumValue(stringify!($name), v as u32)),
                }
            }
        }
    };
}

wire_enum! {
    /// MMS message-type codes.
    pub enum MessageType: u8 {
        SendReq = 128,
        SendConf = 129,
        NotificationInd = 130,
        NotifyRespInd = 131,
        RetrieveConf = 132,
        AcknowledgeInd = 133,
        DeliveryInd = 134,
        ReadRecInd = 135,
        ReadOrigInd = 136,
        ForwardReq = 137,
        ForwardConf = 138,
    }
}

wire_enum! {
    pub enum Priority: u8 {
        Low = 128,
        Normal = 129,
        High = 130,
    }
}

wire_enum! {
    pub enum MessageClass: u8 {
        Personal = 128,
        Advertisement = 129,
        Informational = 130,
        Auto = 131,
    }
}

wire_enum! {
    /// Read-Status values.
    pub enum ReadStatus: u8 {
        Read = 128,
        Deleted = 129,
    }
}

impl ReadStatus {
    pub const READ_STATUS_READ: u8 = 128;
    pub const READ_STATUS_DELETED: u8 = 129;
}

wire_enum! {
    /// Retrieve-Status values; only the success/generic-failure markers are
    /// distinguished at this layer, the numeric value is kept alongside for
    /// anything finer-grained callers need.
    pub enum RetrieveStatusClass: u8 {
        Ok = 128,
        ErrorTransientFailure = 192,
        ErrorPermanentFailure = 224,
    }
}

/// Response-Status, with the reserved-range collapsing rule from section
/// 4.1: 196-223 -> 192 (transient-failure), 234-255 -> 224
/// (permanent-failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    ErrorUnspecified,
    ErrorServiceDenied,
    ErrorMessageFormatCorrupt,
    ErrorSendingAddressUnresolved,
    ErrorMessageNotFound,
    ErrorNetworkProblem,
    ErrorContentNotAccepted,
    ErrorUnsupportedMessage,
    ErrorTransientFailure,
    ErrorTransientServiceDenied,
    ErrorTransientMessageNotFound,
    ErrorTransientNetworkProblem,
    ErrorPermanentFailure,
    ErrorPermanentServiceDenied,
    ErrorPermanentMessageFormatCorrupt,
    ErrorPermanentSendingAddressUnresolved,
    ErrorPermanentMessageNotFound,
    ErrorPermanentContentNotAccepted,
    ErrorPermanentReplyChargingLimitationsNotMet,
    ErrorPermanentReplyChargingRequestNotAccepted,
    ErrorPermanentReplyChargingForwardingDenied,
    ErrorPermanentReplyChargingNotSupported,
    ErrorPermanentAddressHiding,
    ErrorPermanentLackOfPrepaid,
    /// Any other value in the reserved ranges, collapsed to the nearest
    /// transient/permanent bucket, or a value this codec doesn't
    /// otherwise recognise; the original numeric code is preserved for
    /// diagnostics.
    Other(u32),
}

impl ResponseStatus {
    pub fn to_wire(self) -> u32 {
        use ResponseStatus::*;
        match self {
            Ok => 0x80,
            ErrorUnspecified => 0x81,
            ErrorServiceDenied => 0x82,
            ErrorMessageFormatCorrupt => 0x83,
            ErrorSendingAddressUnresolved => 0x84,
            ErrorMessageNotFound => 0x85,
            ErrorNetworkProblem => 0x86,
            ErrorContentNotAccepted => 0x87,
            ErrorUnsupportedMessage => 0x88,
            ErrorTransientFailure => 0xC0,
            ErrorTransientServiceDenied => 0xC1,
            ErrorTransientMessageNotFound => 0xC2,
            ErrorTransientNetworkProblem => 0xC3,
            ErrorPermanentFailure => 0xE0,
            ErrorPermanentServiceDenied => 0xE1,
            ErrorPermanentMessageFormatCorrupt => 0xE2,
            ErrorPermanentSendingAddressUnresolved => 0xE3,
            ErrorPermanentMessageNotFound => 0xE4,
            ErrorPermanentContentNotAccepted => 0xE5,
            ErrorPermanentReplyChargingLimitationsNotMet => 0xE6,
            ErrorPermanentReplyChargingRequestNotAccepted => 0xE7,
            ErrorPermanentReplyChargingForwardingDenied => 0xE8,
            ErrorPermanentReplyChargingNotSupported => 0xE9,
            ErrorPermanentAddressHiding => 0xEA,
            ErrorPermanentLackOfPrepaid => 0xEB,
            Other(v) => v,
        }
    }

    pub fn from_wire(value: u32) -> Self {
        use ResponseStatus::*;
        let collapsed = match value {
            0x80 => return Ok,
            0x81 => return ErrorUnspecified,
            0x82 => return ErrorServiceDenied,
            0x83 => return ErrorMessageFormatCorrupt,
            0x84 => return ErrorSendingAddressUnresolved,
            0x85 => return ErrorMessageNotFound,
            0x86 => return ErrorNetworkProblem,
            0x87 => return ErrorContentNotAccepted,
            0x88 => return ErrorUnsupportedMessage,
            0xC0 => return ErrorTransientFailure,
            0xC1 => return ErrorTransientServiceDenied,
            0xC2 => return ErrorTransientMessageNotFound,
            0xC3 => return ErrorTransientNetworkProblem,
            0xE0 => return ErrorPermanentFailure,
            0xE1 => return ErrorPermanentServiceDenied,
            0xE2 => return ErrorPermanentMessageFormatCorrupt,
            0xE3 => return ErrorPermanentSendingAddressUnresolved,
            0xE4 => return ErrorPermanentMessageNotFound,
            0xE5 => return ErrorPermanentContentNotAccepted,
            0xE6 => return ErrorPermanentReplyChargingLimitationsNotMet,
            0xE7 => return ErrorPermanentReplyChargingRequestNotAccepted,
            0xE8 => return ErrorPermanentReplyChargingForwardingDenied,
            0xE9 => return ErrorPermanentReplyChargingNotSupported,
            0xEA => return ErrorPermanentAddressHiding,
            0xEB => return ErrorPermanentLackOfPrepaid,
            196..=223 => 0xC0,
            234..=255 => 0xE0,
            other => other,
        };
        Other(collapsed)
    }

    pub fn is_ok(self) -> bool {
        matches!(self, ResponseStatus::Ok)
    }

    pub fn is_transient(self) -> bool {
        let w = self.to_wire();
        (0xC0..=0xFF).contains(&w) && w < 0xE0
    }
}

/// Status values reported back to the `Handler` for `M-Delivery.ind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Expired,
    Retrieved,
    Rejected,
    Deferred,
    Unrecognised,
    Forwarded,
    Unreachable,
    Unknown,
    Indeterminate,
}

impl DeliveryStatus {
    pub fn from_wire(value: u8) -> Self {
        use DeliveryStatus::*;
        match value {
            128 => Expired,
            129 => Retrieved,
            130 => Rejected,
            131 => Deferred,
            132 => Unrecognised,
            133 => Unknown,
            134 => Forwarded,
            135 => Unreachable,
            _ => Indeterminate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_status_collapses_reserved_ranges() {
        assert_eq!(ResponseStatus::from_wire(200).to_wire(), 0xC0);
        assert_eq!(ResponseStatus::from_wire(240).to_wire(), 0xE0);
    }

    #[test]
    fn response_status_round_trips_known_values() {
        assert!(matches!(ResponseStatus::from_wire(0x80), ResponseStatus::Ok));
        assert_eq!(ResponseStatus::from_wire(0x82).to_wire(), 0x82);
    }

    #[test]
    fn priority_round_trip() {
        assert_eq!(Priority::from_wire(129).unwrap().to_wire(), 129);
    }
}
