//! Sample timer abstraction.

use std::io;
use std::time::Duration;

/// Arms and disarms the periodic tick source driving the CPU sampler.
///
/// The platform implementation wires this to a real interval timer; hosts
/// that own their tick delivery, and tests, use [`ManualTimer`].
pub trait SampleTimer {
    fn arm(&mut self, interval: Duration) -> io::Result<()>;
    fn disarm(&mut self) -> io::Result<()>;
}

/// No-op timer for hosts that call `handle_tick` themselves.
#[derive(Debug, Default)]
pub struct ManualTimer {
    interval: Option<Duration>,
}

impl ManualTimer {
    pub fn new() -> Self {
        ManualTimer::default()
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// The interval the timer was last armed with.
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

impl SampleTimer for ManualTimer {
    fn arm(&mut self, interval: Duration) -> io::Result<()> {
        self.interval = Some(interval);
        Ok(())
    }

    fn disarm(&mut self) -> io::Result<()> {
        self.interval = None;
        Ok(())
    }
}
