use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::error::{DeckError, Result};
use crate::peer::RoomCode;
use crate::quiz::{QuizAnswerKey, DEFAULT_QUESTION_COUNT};

pub struct Config {
    pub server: ServerConfig,
    pub deck: DeckConfig,
    pub logging: LoggingConfig,
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_url: String,
}

pub struct DeckConfig {
    pub data_dir: String,
    pub question_count: u32,
    pub answer_key: QuizAnswerKey,
    /// Fixed room code, so a restarted host keeps the same link
    pub room_code: Option<RoomCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let port: u16 = parse_var("SERVER_PORT", 8080)?;
        let question_count: u32 = parse_var("QUIZ_QUESTION_COUNT", DEFAULT_QUESTION_COUNT)?;
        if question_count == 0 {
            return Err(DeckError::InvalidConfiguration(
                "QUIZ_QUESTION_COUNT must be at least 1".to_string(),
            ));
        }

        let answer_key = load_answer_key()?;
        answer_key.validate(question_count)?;

        let room_code = match non_empty_var("DECK_ROOM_CODE") {
            Some(code) => Some(code.parse()?),
            None => None,
        };

        let format = match non_empty_var("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(DeckError::ConfigurationParseFailed(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
                public_url: non_empty_var("PUBLIC_URL")
                    .unwrap_or_else(|| format!("http://localhost:{}", port)),
            },
            deck: DeckConfig {
                data_dir: env::var("DECK_DATA_DIR").unwrap_or_else(|_| "./deck-data".to_string()),
                question_count,
                answer_key,
                room_code,
            },
            logging: LoggingConfig { format },
        })
    }

    /// Problems to log once tracing is initialised
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.deck.answer_key.is_empty() {
            warnings.push("No quiz answer key configured, every student answer will grade as incorrect");
        }
        warnings
    }

    pub fn bind_address(&self) -> ([u8; 4], u16) {
        let ip_addr = self.parse_host_to_ipv4();
        (ip_addr.octets(), self.server.port)
    }

    /// Link students open to join `room`
    pub fn join_link(&self, room: &RoomCode) -> String {
        format!(
            "{}/student.html?room={}",
            self.server.public_url.trim_end_matches('/'),
            urlencoding::encode(room.as_str())
        )
    }

    fn parse_host_to_ipv4(&self) -> Ipv4Addr {
        // Try to parse as IP address first
        if let Ok(addr) = self.server.host.parse::<IpAddr>() {
            match addr {
                IpAddr::V4(ipv4) => return ipv4,
                IpAddr::V6(_) => {
                    tracing::warn!(
                        host = %self.server.host,
                        "IPv6 address provided but only IPv4 supported, using 0.0.0.0"
                    );
                    return Ipv4Addr::new(0, 0, 0, 0);
                }
            }
        }

        match self.server.host.as_str() {
            "localhost" => Ipv4Addr::new(127, 0, 0, 1),
            "" | "0.0.0.0" => Ipv4Addr::new(0, 0, 0, 0),
            _ => {
                tracing::warn!(
                    host = %self.server.host,
                    "Unable to parse host as IPv4, using 0.0.0.0"
                );
                Ipv4Addr::new(0, 0, 0, 0)
            }
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match non_empty_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DeckError::ConfigurationParseFailed(format!("{}='{}'", name, raw))),
        None => Ok(default),
    }
}

/// `QUIZ_ANSWER_KEY` (inline `1=B,2=A`) wins over `QUIZ_ANSWER_KEY_FILE` (JSON object)
fn load_answer_key() -> Result<QuizAnswerKey> {
    if let Some(inline) = non_empty_var("QUIZ_ANSWER_KEY") {
        return QuizAnswerKey::parse(&inline);
    }

    match non_empty_var("QUIZ_ANSWER_KEY_FILE") {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| {
                DeckError::ConfigurationParseFailed(format!("{}: {}", path, e))
            })
        }
        None => Ok(QuizAnswerKey::default()),
    }
}
