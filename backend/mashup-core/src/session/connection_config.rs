use crate::error::session::SessionError;
use crate::proto::MashupConnectionConfigs;

use common::RedactedToken;

/// Credential plus the address it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub auth_token: RedactedToken,
    pub server: String,
    pub port: u16,
}

impl ConnectionConfig {
    pub fn new(auth_token: impl Into<RedactedToken>, server: impl Into<String>, port: u16) -> Self {
        Self {
            auth_token: auth_token.into(),
            server: server.into(),
            port,
        }
    }

    /// The peer advertised in a `CollaborateInit` request.
    ///
    /// Uses the request's `caller_token` as the credential: it is what the
    /// host expects to see on calls coming back from the mashup.
    #[track_caller]
    pub fn peer_from_request(request: &MashupConnectionConfigs) -> Result<Self, SessionError> {
        if request.server.is_empty() {
            return Err(SessionError::transport("Peer did not advertise a server address"));
        }

        let port = u16::try_from(request.port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| {
                SessionError::transport(format!("Peer advertised invalid port {}", request.port))
            })?;

        Ok(Self {
            auth_token: RedactedToken::new(request.caller_token.clone()),
            server: request.server.clone(),
            port,
        })
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn authority(&self) -> String {
        if self.server.contains(':') && !self.server.starts_with('[') {
            format!("[{}]:{}", self.server, self.port)
        } else {
            format!("{}:{}", self.server, self.port)
        }
    }

    pub fn to_wire(&self) -> MashupConnectionConfigs {
        MashupConnectionConfigs {
            auth_token: self.auth_token.as_str().to_string(),
            caller_token: String::new(),
            server: self.server.clone(),
            port: i64::from(self.port),
        }
    }
}
