use serde::{Deserialize, Serialize};

use super::sentiment::Tone;
use super::thought::Thought;

const DEFAULT_WIDTH: f64 = 900.0;
const DEFAULT_HEIGHT: f64 = 500.0;
const MIN_SIZE: f64 = 80.0;
const MAX_SIZE: f64 = 150.0;
const MAX_DELAY_SECS: f64 = 2.0;

/// Dimensions of the area bubbles are laid out in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub width: f64,
    pub height: f64,
}

impl Container {
    /// Zero-sized containers (not yet measured) fall back to 900 x 500
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: if width > 0.0 { width } else { DEFAULT_WIDTH },
            height: if height > 0.0 { height } else { DEFAULT_HEIGHT },
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

/// Where and how to draw one thought
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleLayout {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub animation_delay_secs: f64,
    pub tone: Tone,
    pub color: String,
}

/// `frac(sin(seed) * 10000)`, in `[0, 1)`
pub fn pseudo_random(seed: f64) -> f64 {
    let x = seed.sin() * 10000.0;
    x - x.floor()
}

/// Side length of the bubble for a given text.
///
/// Length is measured in UTF-16 code units so that every viewer agrees.
pub fn bubble_size(text: &str) -> f64 {
    let length = text.encode_utf16().count() as f64;
    (length * 5.0 + 50.0).clamp(MIN_SIZE, MAX_SIZE)
}

/// Deterministic placement of a thought.
///
/// The horizontal zone follows the sign of the score (negative left,
/// neutral centre, positive right); the position inside the zone, the
/// vertical position and the animation delay come from `pseudo_random`
/// seeded with `id`, `id + 1` and `id + 2`.
pub fn place(thought: &Thought, container: Container) -> BubbleLayout {
    let size = bubble_size(&thought.text);
    let width = container.width;
    let tone = thought.tone();

    let (zone_start, mut zone_end) = match tone {
        Tone::Positive => (width * 0.66, width - size),
        Tone::Negative => (0.0, width * 0.33 - size),
        Tone::Neutral => (width * 0.33, width * 0.66 - size),
    };
    if zone_end < zone_start {
        zone_end = zone_start;
    }

    let seed = thought.id as f64;
    let x = zone_start + pseudo_random(seed) * (zone_end - zone_start);
    let y = pseudo_random(seed + 1.0) * (container.height - size);
    let animation_delay_secs = pseudo_random(seed + 2.0) * MAX_DELAY_SECS;

    BubbleLayout {
        id: thought.id,
        x,
        y,
        size,
        animation_delay_secs,
        tone,
        color: tone.color().to_string(),
    }
}

/// Lay out every thought, keeping list order
pub fn place_all(thoughts: &[Thought], container: Container) -> Vec<BubbleLayout> {
    thoughts.iter().map(|t| place(t, container)).collect()
}
