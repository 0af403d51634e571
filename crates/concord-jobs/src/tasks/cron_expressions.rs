//! Common cron expressions (seconds-resolution, six fields).

use concord_core::{ConcordError, ConcordResult};
use cron::Schedule;
use std::str::FromStr;

/// Every minute.
pub const EVERY_MINUTE: &str = "0 * * * * *";

/// Every 5 minutes.
pub const EVERY_5_MINUTES: &str = "0 */5 * * * *";

/// Every 15 minutes.
pub const EVERY_15_MINUTES: &str = "0 */15 * * * *";

/// Every hour.
pub const EVERY_HOUR: &str = "0 0 * * * *";

/// Every day at midnight.
pub const DAILY_MIDNIGHT: &str = "0 0 0 * * *";

/// Every Monday at midnight.
pub const WEEKLY_MONDAY: &str = "0 0 0 * * MON";

/// First day of every month at midnight.
pub const MONTHLY: &str = "0 0 0 1 * *";

/// Parses a cron expression into a schedule.
pub fn parse(expression: &str) -> ConcordResult<Schedule> {
    Schedule::from_str(expression)
        .map_err(|e| ConcordError::validation(format!("Invalid cron expression '{expression}': {e}")))
}
