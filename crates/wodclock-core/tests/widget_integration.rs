//! Integration tests for the widget driving a full run on a manual clock.

use std::rc::Rc;

use proptest::prelude::*;
use wodclock_core::audio::RecordingOutput;
use wodclock_core::{
    AudioCueEmitter, AudioError, Event, ManualClock, ProtocolConfig, ProtocolType, TickScheduler,
    TimerWidget, ToneOutput, WidgetState,
};

fn widget(clock: &Rc<ManualClock>) -> (RecordingOutput, TimerWidget) {
    let rec = RecordingOutput::new();
    let sink = rec.clone();
    let audio = AudioCueEmitter::new(Box::new(move || -> Result<Box<dyn ToneOutput>, AudioError> {
        Ok(Box::new(sink.clone()))
    }));
    let widget = TimerWidget::new(TickScheduler::new(clock.clone()), audio);
    (rec, widget)
}

fn start(widget: &mut TimerWidget, protocol: ProtocolType, cfg: &ProtocolConfig) {
    widget.open_menu().unwrap();
    widget.select_type(protocol).unwrap();
    widget.start_timer(cfg, Some("session-1".into())).unwrap();
}

fn run_for(clock: &ManualClock, widget: &mut TimerWidget, gaps_ms: &[u64]) -> Vec<Event> {
    let mut events = Vec::new();
    for gap in gaps_ms {
        clock.advance_ms(*gap);
        events.extend(widget.poll());
    }
    events
}

#[test]
fn full_tabata_run_completes_once() {
    let clock = Rc::new(ManualClock::new());
    let (rec, mut w) = widget(&clock);
    start(
        &mut w,
        ProtocolType::Tabata,
        &ProtocolConfig::tabata(8, 20, 10).with_tabata_round(4, 1),
    );

    let events = run_for(&clock, &mut w, &vec![1_000; 8 * 30 + 60 + 4 * 30 + 10]);
    let completions = events.iter().filter(|e| e.name() == "all_complete").count();
    assert_eq!(completions, 1);
    assert_eq!(w.runtime_state().unwrap().current_session_index, 2);
    assert!(rec.count() > 0);

    w.acknowledge_completion();
    assert_eq!(w.state(), WidgetState::Badge);
}

#[test]
fn death_by_emom_never_completes_until_cancelled() {
    let clock = Rc::new(ManualClock::new());
    let (_rec, mut w) = widget(&clock);
    start(&mut w, ProtocolType::Emom, &ProtocolConfig::death_by(1));

    let events = run_for(&clock, &mut w, &vec![1_000; 600]);
    assert!(!events.iter().any(|e| e.name() == "all_complete"));
    assert_eq!(w.time_update().unwrap().round, 11);
    assert_eq!(w.progress_pct(), None);

    let events = w.stop_timer();
    assert_eq!(events[0].name(), "timer_cancelled");
    assert_eq!(w.state(), WidgetState::Badge);
}

#[test]
fn open_for_time_counts_up() {
    let clock = Rc::new(ManualClock::new());
    let (_rec, mut w) = widget(&clock);
    start(&mut w, ProtocolType::ForTime, &ProtocolConfig::for_time(None));
    run_for(&clock, &mut w, &[1_000, 1_000, 63_000]);
    assert_eq!(w.display(), Some("01:05"));
    assert_eq!(w.time_update().unwrap().remaining_secs, None);
}

#[test]
fn snapshot_serializes_for_hosts() {
    let clock = Rc::new(ManualClock::new());
    let (_rec, mut w) = widget(&clock);
    start(&mut w, ProtocolType::Amrap, &ProtocolConfig::amrap(300));
    let json = serde_json::to_value(w.snapshot()).unwrap();
    assert_eq!(json["type"], "state_snapshot");
    assert_eq!(json["widget"], "running");
    assert_eq!(json["protocol"], "AMRAP");
    assert_eq!(json["runtime"]["currentSessionIndex"], 0);
}

fn gaps() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..4_000, 1..200)
}

proptest! {
    #[test]
    fn rest_countdown_never_increases(rest_min in 1u64..3, gaps in gaps()) {
        let clock = Rc::new(ManualClock::new());
        let (_rec, mut w) = widget(&clock);
        start(
            &mut w,
            ProtocolType::Amrap,
            &ProtocolConfig::amrap(5).with_amrap_round(5, rest_min),
        );
        let events = run_for(&clock, &mut w, &gaps);

        let mut last = u64::MAX;
        let mut saw_zero = false;
        for event in &events {
            match event {
                Event::RestStarted { rest_secs, .. } => {
                    prop_assert_eq!(*rest_secs, rest_min * 60);
                    last = *rest_secs;
                }
                Event::RestTick { remaining_secs, .. } => {
                    prop_assert!(*remaining_secs <= last);
                    last = *remaining_secs;
                    saw_zero |= *remaining_secs == 0;
                }
                Event::SessionStarted { session_index: 1, .. } => {
                    prop_assert!(saw_zero, "session 1 started before rest reached zero");
                }
                _ => {}
            }
        }
    }

    #[test]
    fn paused_interval_adds_no_elapsed_time(
        before_ms in 0u64..5_000,
        paused_ms in 0u64..10_000_000,
        after_ms in 1_000u64..5_000,
    ) {
        let cfg = ProtocolConfig::amrap(3_600);

        let clock_a = Rc::new(ManualClock::new());
        let (_ra, mut paused) = widget(&clock_a);
        start(&mut paused, ProtocolType::Amrap, &cfg);
        clock_a.advance_ms(before_ms);
        paused.poll();
        paused.pause();
        clock_a.advance_ms(paused_ms);
        prop_assert!(paused.poll().is_empty());
        paused.resume();
        clock_a.advance_ms(after_ms);
        paused.poll();

        let clock_b = Rc::new(ManualClock::new());
        let (_rb, mut straight) = widget(&clock_b);
        start(&mut straight, ProtocolType::Amrap, &cfg);
        clock_b.advance_ms(before_ms);
        straight.poll();
        clock_b.advance_ms(after_ms);
        straight.poll();

        prop_assert_eq!(paused.time_update(), straight.time_update());
        prop_assert_eq!(paused.runtime_state(), straight.runtime_state());
    }

    #[test]
    fn minimize_maximize_is_invisible_to_timing(gaps in gaps()) {
        let clock = Rc::new(ManualClock::new());
        let (_rec, mut w) = widget(&clock);
        start(
            &mut w,
            ProtocolType::Tabata,
            &ProtocolConfig::tabata(8, 20, 10).with_tabata_round(4, 1),
        );
        run_for(&clock, &mut w, &gaps);
        let before = (w.runtime_state(), w.time_update(), w.display().map(str::to_string));
        prop_assume!(w.minimize_timer().is_some());
        w.maximize_timer();
        let after = (w.runtime_state(), w.time_update(), w.display().map(str::to_string));
        prop_assert_eq!(before, after);
    }

    #[test]
    fn cancel_while_resting_goes_to_badge_without_completion(extra_ms in 0u64..59_000) {
        let clock = Rc::new(ManualClock::new());
        let (_rec, mut w) = widget(&clock);
        start(
            &mut w,
            ProtocolType::Amrap,
            &ProtocolConfig::amrap(10).with_amrap_round(10, 1),
        );
        let mut events = run_for(&clock, &mut w, &[10_000]);
        clock.advance_ms(extra_ms);
        prop_assert!(w.runtime_state().unwrap().is_resting);

        events.extend(w.cancel());
        prop_assert_eq!(w.state(), WidgetState::Badge);
        events.extend(run_for(&clock, &mut w, &[60_000, 60_000]));
        prop_assert!(!events.iter().any(|e| e.name() == "all_complete"));
    }
}
