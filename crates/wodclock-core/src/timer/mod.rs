mod clock;
mod runner;
mod scheduler;
mod sequencer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use runner::{
    renderer_for, RenderOutcome, RenderSignal, SegmentRunner, SessionRenderer, TimeUpdate,
    DEFAULT_COUNTDOWN_SECS,
};
pub use scheduler::{HandleState, Tick, TickHandle, TickScheduler, DEFAULT_TICK_INTERVAL};
pub use sequencer::{Sequencer, SequencerEvent, SequencerState, TimerRuntimeState};

/// Zero-padded `mm:ss`. Minutes keep growing past 99.
pub fn format_mmss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::format_mmss;

    #[test]
    fn mmss_is_zero_padded() {
        assert_eq!(format_mmss(0), "00:00");
        assert_eq!(format_mmss(65), "01:05");
        assert_eq!(format_mmss(600), "10:00");
        assert_eq!(format_mmss(6_000), "100:00");
    }
}
