//! Common types shared across the engine: values, conversions, sort orders and
//! constants.

mod constants;
mod convertible;
mod sort_order;
mod value;

pub use constants::*;
pub use convertible::*;
pub use sort_order::*;
pub use value::*;

use chrono::{DateTime, SubsecRound, Utc};

/// Current UTC time truncated to milliseconds, the precision the store keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
