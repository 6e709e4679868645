//! The Rosetta error table.
//!
//! Every failure a client can see is one of the [`RosettaErrorKind`]
//! variants below. The `{code, message, retriable}` triple of a kind is
//! fixed at compile time; only the optional `details` object varies per
//! occurrence.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

macro_rules! error_table {
    ($($kind:ident = $code:literal, $message:literal, $retriable:literal;)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum RosettaErrorKind {
            $($kind),+
        }

        impl RosettaErrorKind {
            pub const ALL: &'static [RosettaErrorKind] = &[$(Self::$kind),+];

            pub const fn code(self) -> u32 {
                match self {
                    $(Self::$kind => $code),+
                }
            }

            pub const fn message(self) -> &'static str {
                match self {
                    $(Self::$kind => $message),+
                }
            }

            pub const fn retriable(self) -> bool {
                match self {
                    $(Self::$kind => $retriable),+
                }
            }

            pub fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some(Self::$kind),)+
                    _ => None,
                }
            }
        }
    };
}

error_table! {
    InvalidAccount = 601, "Invalid Account.", false;
    InsufficientFunds = 602, "Insufficient Funds.", false;
    AccountEmpty = 603, "Account is empty.", false;
    InvalidBlockIndex = 604, "Invalid block index.", false;
    BlockNotFound = 605, "Block not found.", true;
    InvalidBlockHash = 606, "Invalid block hash.", false;
    TransactionNotFound = 607, "Transaction not found.", true;
    InvalidTransactionHash = 608, "Invalid transaction hash.", false;
    InvalidParams = 609, "Invalid params.", false;
    InvalidNetwork = 610, "Invalid network.", false;
    InvalidBlockchain = 611, "Invalid blockchain.", false;
    UnknownError = 612, "Unknown error.", true;
    EmptyNetworkIdentifier = 613, "Network identifier object can not be empty.", false;
    EmptyAccountIdentifier = 614, "Account identifier object can not be empty.", false;
    InvalidBlockIdentifier = 615, "Block identifier is not valid.", false;
    InvalidTransactionIdentifier = 616, "Transaction identifier is not valid.", false;
    EmptyBlockchain = 617, "Blockchain name can not be empty.", false;
    EmptyNetwork = 618, "Network name can not be empty.", false;
    InvalidCurveType = 619, "Invalid curve type.", false;
    InvalidPublicKey = 620, "invalid public key.", false;
    InvalidOperation = 621, "Invalid operation", false;
    InvalidFee = 622, "Invalid fee", false;
    InvalidCurrencySymbol = 623, "Invalid symbol", false;
    InvalidCurrencyDecimals = 624, "Invalid currency decimals", false;
    InvalidTransactionType = 625, "Invalid transaction type", false;
    InvalidSender = 626, "Invalid sender address", false;
    InvalidRecipient = 627, "Invalid recipient address", false;
    InvalidTransactionString = 628, "Invalid transaction string", true;
    TransactionNotSigned = 629, "Transaction not signed", false;
    InvalidAmount = 630, "Amount not available", false;
    InvalidFees = 631, "Fees not available", false;
    EmptyPublicKey = 632, "Public key not available", false;
    NoSignatures = 633, "no signature found", false;
    InvalidSignature = 634, "Invalid Signature", false;
    SignatureNotVerified = 635, "Signature(s) not verified with this public key(s)", false;
    NeedOnePublicKey = 636, "Need one public key for single signature", false;
    NeedOnlyOneSignature = 637, "Need only one signature", false;
    SignatureTypeNotSupported = 638, "Signature type not supported.", false;
    MissingTransactionSize = 639, "Transaction size required to calculate total fee.", false;
    StackingEligibilityError = 640, "Account not eligible for stacking.", false;
    InvalidSubAccount = 641, "Invalid sub-account", false;
    MissingNonce = 642, "Missing transaction nonce", false;
    MissingContractAddress = 643, "Missing contract address", false;
    MissingContractName = 644, "Missing contract name", false;
    MissingSignerKey = 645, "Missing signer key or signer signature", false;
}

impl RosettaErrorKind {
    /// Not-found kinds answer 404; everything else is a 400.
    pub fn http_status(self) -> u16 {
        match self {
            Self::BlockNotFound | Self::TransactionNotFound => 404,
            _ => 400,
        }
    }

    pub fn body(self) -> RosettaErrorBody {
        RosettaErrorBody {
            code: self.code(),
            message: self.message().to_string(),
            retriable: self.retriable(),
            details: None,
        }
    }
}

/// The JSON shape of an error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosettaErrorBody {
    pub code: u32,
    pub message: String,
    pub retriable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// A failed step: a fixed kind plus optional per-occurrence details.
#[derive(Debug, Clone, PartialEq)]
pub struct RosettaError {
    pub kind: RosettaErrorKind,
    pub details: Option<Value>,
}

impl RosettaError {
    pub fn new(kind: RosettaErrorKind) -> Self {
        Self {
            kind,
            details: None,
        }
    }

    /// Attaches `{"message": ...}` as details.
    pub fn with_message(kind: RosettaErrorKind, message: impl fmt::Display) -> Self {
        Self {
            kind,
            details: Some(json!({ "message": message.to_string() })),
        }
    }

    pub fn with_details(kind: RosettaErrorKind, details: Value) -> Self {
        Self {
            kind,
            details: Some(details),
        }
    }

    pub fn body(&self) -> RosettaErrorBody {
        RosettaErrorBody {
            details: self.details.clone(),
            ..self.kind.body()
        }
    }
}

impl From<RosettaErrorKind> for RosettaError {
    fn from(kind: RosettaErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for RosettaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind.message(), self.kind.code())?;
        if let Some(details) = &self.details {
            write!(f, ": {details}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RosettaError {}

impl Serialize for RosettaError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body().serialize(serializer)
    }
}
