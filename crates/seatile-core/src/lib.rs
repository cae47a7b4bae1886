pub mod error;
pub mod time;

pub use error::{ErrorCode, SeatileError, SeatileResult};
pub use time::{TimeKey, TIME_KEY_YEAR_MAX, TIME_KEY_YEAR_MIN};
