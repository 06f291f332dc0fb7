//! Station (scanner) sessions: `{ stationId, eventId, iat, exp }`
//!
//! Verification here is structural only. A scanner session must still be
//! checked against the live station record before it authorizes anything; see
//! [`crate::gate::AuthorizationGate::authorize_station`].

use serde::{Deserialize, Serialize};

use super::SessionService;
use crate::codec::CodecError;

/// Scanner session lifetime, one shift
pub const SCANNER_SESSION_TTL: i64 = 12 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerSession {
    pub station_id: String,
    pub event_id: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionService {
    pub fn issue_scanner_session(
        &self,
        station_id: &str,
        event_id: &str,
        now: i64,
    ) -> Result<String, CodecError> {
        self.codec().encode(&ScannerSession {
            station_id: station_id.to_string(),
            event_id: event_id.to_string(),
            iat: now,
            exp: now.saturating_add(SCANNER_SESSION_TTL),
        })
    }

    /// Signature and shape check; `None` for anything unusable
    pub fn verify_scanner_session(&self, token: &str, now: i64) -> Option<ScannerSession> {
        let session: ScannerSession = self.codec().decode_as(token).ok()?;

        if session.station_id.is_empty() || session.event_id.is_empty() || now >= session.exp {
            return None;
        }
        Some(session)
    }
}
