pub mod channel;
mod client;
mod host;
mod protocol;
mod room;
mod status;
mod student;

pub use channel::{ChannelEvent, LocalChannel, PeerChannel, PeerError};
pub use client::StudentClient;
pub use host::HostSession;
pub use protocol::PeerMessage;
pub use room::{RoomCode, HOST_PEER_PREFIX};
pub use status::{Status, StatusLevel};
pub use student::{ClassResult, ResultRow, StudentSession, StudentUpdate};
