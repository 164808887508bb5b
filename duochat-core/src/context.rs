//! Date/time system context attached to every dispatch

use crate::protocol::types::SystemContext;
use chrono::{DateTime, Local, TimeZone};

/// Builds the ephemeral system instruction from the wall clock.
///
/// Formatting is fixed (English weekday and month names, 12-hour clock)
/// and does not depend on the host locale.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextInjector;

impl ContextInjector {
    pub fn new() -> Self {
        Self
    }

    /// Produce the system context for "now" in the local time zone
    pub fn build(&self) -> SystemContext {
        Self::render(&Local::now())
    }

    /// Produce the system context for a given instant
    pub fn render<Tz>(now: &DateTime<Tz>) -> SystemContext
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let date = now.format("%A, %B %-d, %Y");
        let time = now.format("%I:%M %p");
        SystemContext::new(format!(
            "Current date and time: {}, {}. Always use this information when answering questions about dates, times, or current events.",
            date, time
        ))
    }
}
