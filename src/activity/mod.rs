//! Thought-bubble activity: scoring free text and laying it out.

mod bubble;
mod sentiment;
mod thought;

pub use bubble::{bubble_size, place, place_all, pseudo_random, BubbleLayout, Container};
pub use sentiment::{SentimentAnalyzer, SentimentScore, Tone};
pub use thought::{Thought, ThoughtClock};
