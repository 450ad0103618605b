use serde::Serialize;
use std::fmt;

use super::channel::PeerError;
use super::room::RoomCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

/// User-visible connection status line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: StatusLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: StatusLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: StatusLevel::Error, message: message.into() }
    }

    pub fn host_ready(room: &RoomCode) -> Self {
        Self::success(format!("Host Ready. Room: {}", room))
    }

    pub fn connecting(room: &RoomCode) -> Self {
        Self::info(format!("Connecting to Room: {}...", room))
    }

    /// Status for a transport failure seen by either role
    pub fn from_peer_error(room: &RoomCode, error: &PeerError) -> Self {
        match error {
            PeerError::PeerUnavailable => Self::error(format!(
                "Host not found (Room: {}). Is the slide deck open?",
                room
            )),
            PeerError::Network(kind) => Self::error(format!("Network Error: {}", kind)),
            PeerError::Channel(detail) => Self::error(format!("Connection Error: {}", detail)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_error_messages() {
        let room: RoomCode = "AB12".parse().unwrap();

        let status = Status::from_peer_error(&room, &PeerError::PeerUnavailable);
        assert_eq!(status.level, StatusLevel::Error);
        assert_eq!(status.message, "Host not found (Room: AB12). Is the slide deck open?");

        let status = Status::from_peer_error(&room, &PeerError::Network("network".into()));
        assert_eq!(status.message, "Network Error: network");
    }

    #[test]
    fn test_host_ready() {
        let room: RoomCode = "ZX90".parse().unwrap();
        assert_eq!(Status::host_ready(&room).to_string(), "Host Ready. Room: ZX90");
    }
}
