pub mod frames;

pub use frames::{ConsumeSettings, ConsumerReport, consume_frames};
