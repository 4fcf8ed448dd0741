//! Wire messages for the mashup collaboration protocol.
//!
//! Every frame on the WebSocket is a binary protobuf message: hosts send
//! [`MashupRequest`], the mashup answers with [`MashupResponse`] carrying the
//! same `request_id`. Messages are declared with the `prost` derives directly
//! so the crate builds without a `protoc` toolchain.

/// Connection parameters exchanged during the handshake.
///
/// On the request side `auth_token` is the bootstrap credential and
/// `caller_token` the credential the host expects back on the reverse
/// channel. On the response side `auth_token` is the freshly minted session
/// credential.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MashupConnectionConfigs {
    #[prost(string, tag = "1")]
    pub auth_token: String,
    #[prost(string, tag = "2")]
    pub caller_token: String,
    #[prost(string, tag = "3")]
    pub server: String,
    #[prost(int64, tag = "4")]
    pub port: i64,
}

/// Credential-only request, and the empty acknowledgement.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MashupEmpty {
    #[prost(string, tag = "1")]
    pub auth_token: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MashupElementState {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(int64, tag = "2")]
    pub state: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MashupDetailedElement {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(message, optional, tag = "2")]
    pub state: Option<MashupElementState>,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(string, tag = "4")]
    pub alias: String,
    #[prost(string, tag = "5")]
    pub description: String,
    #[prost(string, tag = "6")]
    pub genre: String,
    #[prost(string, tag = "7")]
    pub subgenre: String,
    #[prost(int64, repeated, tag = "8")]
    pub parentids: Vec<i64>,
    #[prost(int64, repeated, tag = "9")]
    pub childids: Vec<i64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MashupDetailedElementBundle {
    #[prost(string, tag = "1")]
    pub auth_token: String,
    #[prost(message, repeated, tag = "2")]
    pub detailed_elements: Vec<MashupDetailedElement>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MashupElementStateBundle {
    #[prost(string, tag = "1")]
    pub auth_token: String,
    #[prost(message, repeated, tag = "2")]
    pub element_states: Vec<MashupElementState>,
}

/// A motive: a coarse instruction that tweaks many element states at once.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Motiv {
    #[prost(string, tag = "1")]
    pub auth_token: String,
    #[prost(int64, tag = "2")]
    pub code: i64,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(string, tag = "4")]
    pub data: String,
}

/// Position and size of the host's display area.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MashupDisplayHint {
    #[prost(int64, tag = "1")]
    pub xpos: i64,
    #[prost(int64, tag = "2")]
    pub ypos: i64,
    #[prost(int64, tag = "3")]
    pub width: i64,
    #[prost(int64, tag = "4")]
    pub height: i64,
    #[prost(bool, tag = "5")]
    pub focused: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MashupDisplayBundle {
    #[prost(string, tag = "1")]
    pub auth_token: String,
    #[prost(message, optional, tag = "2")]
    pub display_hint: Option<MashupDisplayHint>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MashupErrorCode {
    Unspecified = 0,
    AuthError = 1,
    ConfigurationError = 2,
    TransportError = 3,
    DelegationError = 4,
    InvalidMessage = 5,
    InternalError = 6,
}

impl MashupErrorCode {
    /// Decode a wire value, mapping unknown codes to `Unspecified`.
    pub fn from_wire(value: i32) -> Self {
        Self::try_from(value).unwrap_or(Self::Unspecified)
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MashupErrorResponse {
    #[prost(enumeration = "MashupErrorCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}

/// Host → mashup envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MashupRequest {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(oneof = "mashup_request::Payload", tags = "2, 3, 4, 5, 6, 7, 8")]
    pub payload: Option<mashup_request::Payload>,
}

pub mod mashup_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        CollaborateInit(super::MashupConnectionConfigs),
        #[prost(message, tag = "3")]
        Shutdown(super::MashupEmpty),
        #[prost(message, tag = "4")]
        GetElements(super::MashupEmpty),
        #[prost(message, tag = "5")]
        UpsertElements(super::MashupDetailedElementBundle),
        #[prost(message, tag = "6")]
        TweakStates(super::MashupElementStateBundle),
        #[prost(message, tag = "7")]
        TweakStatesByMotiv(super::Motiv),
        #[prost(message, tag = "8")]
        OnDisplayChange(super::MashupDisplayBundle),
    }
}

/// Mashup → host envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MashupResponse {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(oneof = "mashup_response::Payload", tags = "2, 3, 4, 5, 6, 7")]
    pub payload: Option<mashup_response::Payload>,
}

pub mod mashup_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        ConnectionConfigs(super::MashupConnectionConfigs),
        #[prost(message, tag = "3")]
        Empty(super::MashupEmpty),
        #[prost(message, tag = "4")]
        DetailedElementBundle(super::MashupDetailedElementBundle),
        #[prost(message, tag = "5")]
        ElementStateBundle(super::MashupElementStateBundle),
        #[prost(message, tag = "6")]
        DisplayHint(super::MashupDisplayHint),
        #[prost(message, tag = "7")]
        Error(super::MashupErrorResponse),
    }
}

impl mashup_request::Payload {
    /// Operation name for logs.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CollaborateInit(_) => "CollaborateInit",
            Self::Shutdown(_) => "Shutdown",
            Self::GetElements(_) => "GetElements",
            Self::UpsertElements(_) => "UpsertElements",
            Self::TweakStates(_) => "TweakStates",
            Self::TweakStatesByMotiv(_) => "TweakStatesByMotiv",
            Self::OnDisplayChange(_) => "OnDisplayChange",
        }
    }
}
