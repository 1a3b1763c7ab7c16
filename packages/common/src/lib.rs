pub mod clock;
pub mod config;
pub mod extract;
pub mod frame;
pub mod record;
pub mod retry;
pub mod shutdown;

pub use clock::MonotonicClock;
pub use frame::{FrameLayout, ParsedFrame, parse_frame};
pub use record::{DecodeError, FrameRecord, decode_payload};
