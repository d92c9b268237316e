use chrono::{Local, NaiveDateTime, NaiveTime};

/// Source of the server's local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Time of day as shown to people, e.g. `3:45:12 PM`.
pub fn display_time(time: NaiveTime) -> String {
    time.format("%-I:%M:%S %p").to_string()
}
