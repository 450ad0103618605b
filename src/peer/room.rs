use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DeckError;

/// Prefix of the host's peer id; the room code follows it
pub const HOST_PEER_PREFIX: &str = "tcu-deck-";

const ROOM_CODE_LEN: usize = 4;
const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Four-character base-36 room code, always upper case.
///
/// Students find the host from this code alone, so two hosts that draw the
/// same code at the same time collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Generate a random room code
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Peer id the host registers under
    pub fn host_peer_id(&self) -> String {
        format!("{}{}", HOST_PEER_PREFIX, self.0)
    }

    /// Recover the room code from a host peer id
    pub fn from_host_peer_id(peer_id: &str) -> Option<Self> {
        peer_id
            .strip_prefix(HOST_PEER_PREFIX)
            .and_then(|code| code.parse().ok())
    }
}

impl FromStr for RoomCode {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        let valid = code.len() == ROOM_CODE_LEN && code.bytes().all(|b| ALPHABET.contains(&b));
        if !valid {
            return Err(DeckError::InvalidRoomCode(s.to_string()));
        }
        Ok(Self(code))
    }
}

impl TryFrom<String> for RoomCode {
    type Error = DeckError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_room_code() {
        for _ in 0..200 {
            let code = RoomCode::generate();
            assert_eq!(code.as_str().len(), 4);
            assert!(code
                .as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_parse_normalises_case() {
        let code: RoomCode = "ab12".parse().unwrap();
        assert_eq!(code.as_str(), "AB12");
        assert_eq!(code.to_string(), "AB12");
    }

    #[test]
    fn test_parse_rejects_bad_codes() {
        assert!("AB1".parse::<RoomCode>().is_err());
        assert!("AB123".parse::<RoomCode>().is_err());
        assert!("AB-1".parse::<RoomCode>().is_err());
        assert!("".parse::<RoomCode>().is_err());
    }

    #[test]
    fn test_host_peer_id_round_trip() {
        let code: RoomCode = "AB12".parse().unwrap();
        assert_eq!(code.host_peer_id(), "tcu-deck-AB12");
        assert_eq!(RoomCode::from_host_peer_id("tcu-deck-AB12"), Some(code));
        assert_eq!(RoomCode::from_host_peer_id("other-AB12"), None);
    }

    #[test]
    fn test_serde_validates() {
        let code: RoomCode = serde_json::from_str("\"zz99\"").unwrap();
        assert_eq!(code.as_str(), "ZZ99");
        assert!(serde_json::from_str::<RoomCode>("\"toolong\"").is_err());
    }
}
