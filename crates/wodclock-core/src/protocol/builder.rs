//! Turns a [`ProtocolConfig`] into a declarative [`SessionPlan`].
//!
//! Pure composition. No timing logic lives here.

use tracing::debug;

use super::plan::{PlannedSession, Repeat, Segment, Session, SessionPlan};
use super::{ProtocolConfig, ProtocolType};
use crate::error::ConfigError;

const SECS_PER_MIN: u64 = 60;

/// Longest accepted duration for any single block, work or rest.
pub const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

/// Most rounds, intervals or extra blocks a single field may ask for.
pub const MAX_ROUNDS: u32 = 1_000;

/// Build the plan for `protocol` from `config`.
///
/// # Errors
/// Returns [`ConfigError::MissingField`] when a field required by the protocol
/// is absent and [`ConfigError::InvalidValue`] for zero lengths or counts, or
/// values past [`MAX_DURATION_SECS`] / [`MAX_ROUNDS`].
pub fn build_plan(
    protocol: ProtocolType,
    config: &ProtocolConfig,
) -> Result<SessionPlan, ConfigError> {
    let sessions = match protocol {
        ProtocolType::ForTime => for_time(config)?,
        ProtocolType::Amrap => amrap(config)?,
        ProtocolType::Emom => emom(config)?,
        ProtocolType::Tabata => tabata(config)?,
    };
    debug!(%protocol, sessions = sessions.len(), "plan built");
    Ok(SessionPlan::new(protocol, sessions))
}

fn single(protocol: ProtocolType, segments: Vec<Segment>, repeat: Repeat) -> Session {
    Session {
        protocol,
        segments,
        repeat,
    }
}

fn bounded_secs(value: u64, field: &'static str) -> Result<u64, ConfigError> {
    if value > MAX_DURATION_SECS {
        return Err(ConfigError::too_large(field, MAX_DURATION_SECS));
    }
    Ok(value)
}

fn positive_secs(value: u64, field: &'static str) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::zero(field));
    }
    bounded_secs(value, field)
}

/// Extra-round rests are entered in minutes.
fn rest_minutes(value: u64, field: &'static str) -> Result<u64, ConfigError> {
    bounded_secs(value.saturating_mul(SECS_PER_MIN), field)
}

fn positive_count(value: u32, field: &'static str) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::zero(field));
    }
    if value > MAX_ROUNDS {
        return Err(ConfigError::too_large(field, u64::from(MAX_ROUNDS)));
    }
    Ok(value)
}

fn for_time(config: &ProtocolConfig) -> Result<Vec<PlannedSession>, ConfigError> {
    let cap = if config.open_time_cap {
        None
    } else {
        config
            .duration
            .map(|d| positive_secs(d, "duration"))
            .transpose()?
    };
    let segment = match cap {
        Some(secs) => Segment::work(secs),
        None => Segment::open_work(),
    };
    Ok(vec![PlannedSession {
        session: single(ProtocolType::ForTime, vec![segment], Repeat::Once),
        rest_after_secs: 0,
    }])
}

fn amrap(config: &ProtocolConfig) -> Result<Vec<PlannedSession>, ConfigError> {
    let first = config
        .duration
        .ok_or_else(|| ConfigError::missing(ProtocolType::Amrap, "duration"))?;
    let first = positive_secs(first, "duration")?;

    let extra = config.amrap_rounds.as_deref().unwrap_or_default();
    if extra.len() > MAX_ROUNDS as usize {
        return Err(ConfigError::too_large("amrapRounds", u64::from(MAX_ROUNDS)));
    }
    let mut rests = Vec::with_capacity(extra.len());
    for round in extra {
        rests.push(rest_minutes(round.rest, "amrapRounds[].rest")?);
    }
    let mut durations = Vec::with_capacity(extra.len() + 1);
    durations.push(first);
    for round in extra {
        durations.push(positive_secs(round.duration, "amrapRounds[].duration")?);
    }

    // Round i+1's configured rest is taken after round i finishes.
    let sessions = durations
        .into_iter()
        .enumerate()
        .map(|(i, secs)| PlannedSession {
            session: single(ProtocolType::Amrap, vec![Segment::work(secs)], Repeat::Once),
            rest_after_secs: rests.get(i).copied().unwrap_or(0),
        })
        .collect::<Vec<_>>();

    if let Some(last) = extra.last() {
        if last.rest > 0 {
            debug!(rest_min = last.rest, "rest on final AMRAP round has no following round");
        }
    }
    Ok(sessions)
}

/// Split `total` seconds into intervals, the last one truncated.
fn emom_intervals(total: u64, interval: u64) -> Vec<Segment> {
    let full = total / interval;
    let remainder = total % interval;
    let mut segments: Vec<Segment> = (0..full).map(|_| Segment::work(interval)).collect();
    if remainder > 0 {
        segments.push(Segment::work(remainder));
    }
    segments
}

fn emom(config: &ProtocolConfig) -> Result<Vec<PlannedSession>, ConfigError> {
    let interval_min = positive_count(config.interval_minutes.unwrap_or(1), "intervalMinutes")?;
    let interval = u64::from(interval_min) * SECS_PER_MIN;

    let first = if config.death_by {
        if config.emom_round.is_some() {
            return Err(ConfigError::InvalidValue {
                field: "emomRound",
                message: "cannot follow an unlimited death-by block".into(),
            });
        }
        single(ProtocolType::Emom, vec![Segment::work(interval)], Repeat::Forever)
    } else {
        let total = config
            .duration
            .ok_or_else(|| ConfigError::missing(ProtocolType::Emom, "duration"))?;
        let total = positive_secs(total, "duration")?;
        single(ProtocolType::Emom, emom_intervals(total, interval), Repeat::Once)
    };

    let mut sessions = vec![PlannedSession {
        session: first,
        rest_after_secs: 0,
    }];

    if let Some(extra) = config.emom_round {
        let rounds = positive_count(extra.round, "emomRound.round")?;
        sessions[0].rest_after_secs = rest_minutes(extra.rest, "emomRound.rest")?;
        sessions.push(PlannedSession {
            session: single(
                ProtocolType::Emom,
                (0..rounds).map(|_| Segment::work(interval)).collect(),
                Repeat::Once,
            ),
            rest_after_secs: 0,
        });
    }
    Ok(sessions)
}

fn tabata_cycles(rounds: u32, work: u64, rest: u64) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(rounds as usize * 2);
    for _ in 0..rounds {
        segments.push(Segment::work(work));
        if rest > 0 {
            segments.push(Segment::rest(rest));
        }
    }
    segments
}

fn tabata(config: &ProtocolConfig) -> Result<Vec<PlannedSession>, ConfigError> {
    let rounds = config
        .rounds
        .ok_or_else(|| ConfigError::missing(ProtocolType::Tabata, "rounds"))?;
    let rounds = positive_count(rounds, "rounds")?;
    let work = config
        .work
        .ok_or_else(|| ConfigError::missing(ProtocolType::Tabata, "work"))?;
    let work = positive_secs(work, "work")?;
    let rest = config
        .rest
        .ok_or_else(|| ConfigError::missing(ProtocolType::Tabata, "rest"))?;
    let rest = bounded_secs(rest, "rest")?;

    let mut sessions = vec![PlannedSession {
        session: single(
            ProtocolType::Tabata,
            tabata_cycles(rounds, work, rest),
            Repeat::Once,
        ),
        rest_after_secs: 0,
    }];

    if let Some(extra) = config.tabata_round {
        let extra_rounds = positive_count(extra.round, "tabataRound.round")?;
        sessions[0].rest_after_secs = rest_minutes(extra.rest, "tabataRound.rest")?;
        sessions.push(PlannedSession {
            session: single(
                ProtocolType::Tabata,
                tabata_cycles(extra_rounds, work, rest),
                Repeat::Once,
            ),
            rest_after_secs: 0,
        });
    }
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SegmentKind;

    #[test]
    fn every_protocol_yields_at_least_one_session() {
        let configs = [
            (ProtocolType::ForTime, ProtocolConfig::for_time(None)),
            (ProtocolType::Amrap, ProtocolConfig::amrap(600)),
            (ProtocolType::Emom, ProtocolConfig::emom(600, 1)),
            (ProtocolType::Tabata, ProtocolConfig::tabata(8, 20, 10)),
        ];
        for (protocol, cfg) in configs {
            let plan = build_plan(protocol, &cfg).unwrap();
            assert!(plan.len() >= 1, "{protocol} produced an empty plan");
            assert_eq!(plan.protocol(), protocol);
        }
    }

    #[test]
    fn tabata_extra_round_rest_is_minutes() {
        let cfg = ProtocolConfig::tabata(8, 20, 10).with_tabata_round(4, 1);
        let plan = build_plan(ProtocolType::Tabata, &cfg).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.rest_after(0), 60);
        assert_eq!(plan.rest_after(1), 0);
        assert_eq!(plan.session(0).unwrap().work_count(), 8);
        assert_eq!(plan.session(1).unwrap().work_count(), 4);
        assert_eq!(plan.session(1).unwrap().target_secs(), Some(120));
    }

    #[test]
    fn amrap_rest_comes_from_following_round() {
        let cfg = ProtocolConfig::amrap(1200)
            .with_amrap_round(600, 2)
            .with_amrap_round(300, 0);
        let plan = build_plan(ProtocolType::Amrap, &cfg).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.rest_after(0), 120);
        assert_eq!(plan.rest_after(1), 0);
        assert_eq!(plan.rest_after(2), 0);
        assert_eq!(plan.session(1).unwrap().target_secs(), Some(600));
    }

    #[test]
    fn amrap_rest_is_not_applied_after_its_own_round() {
        // Rest on the second extra round lands between rounds 1 and 2, not after round 2.
        let cfg = ProtocolConfig::amrap(300)
            .with_amrap_round(300, 0)
            .with_amrap_round(300, 3);
        let plan = build_plan(ProtocolType::Amrap, &cfg).unwrap();
        assert_eq!(plan.rest_after(0), 0);
        assert_eq!(plan.rest_after(1), 180);
        assert_eq!(plan.rest_after(2), 0);
    }

    #[test]
    fn amrap_without_duration_is_config_error() {
        let err = build_plan(ProtocolType::Amrap, &ProtocolConfig::default()).unwrap_err();
        assert_eq!(err, ConfigError::missing(ProtocolType::Amrap, "duration"));
    }

    #[test]
    fn for_time_counts_down_with_cap_and_up_without() {
        let capped = build_plan(ProtocolType::ForTime, &ProtocolConfig::for_time(Some(900))).unwrap();
        assert_eq!(capped.session(0).unwrap().segments, vec![Segment::work(900)]);

        let open = build_plan(ProtocolType::ForTime, &ProtocolConfig::for_time(None)).unwrap();
        assert_eq!(open.session(0).unwrap().segments, vec![Segment::open_work()]);
        assert_eq!(open.total_secs(), None);
    }

    #[test]
    fn for_time_open_flag_overrides_duration() {
        let cfg = ProtocolConfig {
            duration: Some(600),
            open_time_cap: true,
            ..ProtocolConfig::default()
        };
        let plan = build_plan(ProtocolType::ForTime, &cfg).unwrap();
        assert!(plan.session(0).unwrap().is_open_ended());
    }

    #[test]
    fn emom_splits_duration_into_intervals() {
        let plan = build_plan(ProtocolType::Emom, &ProtocolConfig::emom(600, 2)).unwrap();
        let session = plan.session(0).unwrap();
        assert_eq!(session.segments.len(), 5);
        assert!(session.segments.iter().all(|s| *s == Segment::work(120)));
    }

    #[test]
    fn emom_truncates_last_interval() {
        let plan = build_plan(ProtocolType::Emom, &ProtocolConfig::emom(150, 1)).unwrap();
        let segs = &plan.session(0).unwrap().segments;
        assert_eq!(segs, &vec![Segment::work(60), Segment::work(60), Segment::work(30)]);
    }

    #[test]
    fn emom_interval_defaults_to_one_minute() {
        let cfg = ProtocolConfig {
            duration: Some(180),
            ..ProtocolConfig::default()
        };
        let plan = build_plan(ProtocolType::Emom, &cfg).unwrap();
        assert_eq!(plan.session(0).unwrap().segments.len(), 3);
    }

    #[test]
    fn emom_death_by_repeats_forever() {
        let plan = build_plan(ProtocolType::Emom, &ProtocolConfig::death_by(1)).unwrap();
        let session = plan.session(0).unwrap();
        assert_eq!(session.repeat, Repeat::Forever);
        assert_eq!(session.segments, vec![Segment::work(60)]);
    }

    #[test]
    fn emom_extra_round_appends_session_with_rest_before() {
        let cfg = ProtocolConfig::emom(600, 1).with_emom_round(5, 2);
        let plan = build_plan(ProtocolType::Emom, &cfg).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.rest_after(0), 120);
        assert_eq!(plan.session(1).unwrap().segments.len(), 5);
    }

    #[test]
    fn emom_without_duration_is_config_error() {
        let cfg = ProtocolConfig {
            interval_minutes: Some(1),
            ..ProtocolConfig::default()
        };
        assert!(matches!(
            build_plan(ProtocolType::Emom, &cfg),
            Err(ConfigError::MissingField { field: "duration", .. })
        ));
    }

    #[test]
    fn tabata_alternates_work_and_rest() {
        let plan = build_plan(ProtocolType::Tabata, &ProtocolConfig::tabata(2, 20, 10)).unwrap();
        let kinds: Vec<SegmentKind> = plan.session(0).unwrap().segments.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SegmentKind::Work, SegmentKind::Rest, SegmentKind::Work, SegmentKind::Rest]
        );
    }

    #[test]
    fn tabata_missing_work_is_config_error() {
        let cfg = ProtocolConfig {
            rounds: Some(8),
            rest: Some(10),
            ..ProtocolConfig::default()
        };
        assert_eq!(
            build_plan(ProtocolType::Tabata, &cfg).unwrap_err(),
            ConfigError::missing(ProtocolType::Tabata, "work")
        );
    }

    #[test]
    fn zero_rounds_rejected() {
        let err = build_plan(ProtocolType::Tabata, &ProtocolConfig::tabata(0, 20, 10)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "rounds", .. }));
    }

    #[test]
    fn emom_duration_past_limit_rejected() {
        let err = build_plan(ProtocolType::Emom, &ProtocolConfig::emom(u64::MAX, 1)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "duration", .. }));

        let longest = build_plan(ProtocolType::Emom, &ProtocolConfig::emom(MAX_DURATION_SECS, 1)).unwrap();
        assert_eq!(longest.session(0).unwrap().segments.len(), 24 * 60);
    }

    #[test]
    fn tabata_rounds_past_limit_rejected() {
        let err = build_plan(ProtocolType::Tabata, &ProtocolConfig::tabata(u32::MAX, 20, 10))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "rounds", .. }));

        let cfg = ProtocolConfig::tabata(8, 20, 10).with_tabata_round(MAX_ROUNDS + 1, 1);
        let err = build_plan(ProtocolType::Tabata, &cfg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "tabataRound.round", .. }));
    }

    #[test]
    fn emom_extra_rounds_and_interval_past_limit_rejected() {
        let cfg = ProtocolConfig::emom(600, 1).with_emom_round(u32::MAX, 1);
        let err = build_plan(ProtocolType::Emom, &cfg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "emomRound.round", .. }));

        let err = build_plan(ProtocolType::Emom, &ProtocolConfig::emom(600, u32::MAX)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "intervalMinutes", .. }));
    }

    #[test]
    fn work_and_rest_lengths_past_limit_rejected() {
        let too_long = MAX_DURATION_SECS + 1;
        let err = build_plan(ProtocolType::Tabata, &ProtocolConfig::tabata(8, too_long, 10))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "work", .. }));
        let err = build_plan(ProtocolType::Tabata, &ProtocolConfig::tabata(8, 20, too_long))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "rest", .. }));
        let err = build_plan(ProtocolType::ForTime, &ProtocolConfig::for_time(Some(too_long)))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "duration", .. }));
    }

    #[test]
    fn extra_round_rest_past_limit_rejected() {
        let cfg = ProtocolConfig::amrap(600).with_amrap_round(300, u64::MAX);
        let err = build_plan(ProtocolType::Amrap, &cfg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "amrapRounds[].rest", .. }));

        let cfg = ProtocolConfig::tabata(8, 20, 10).with_tabata_round(4, 24 * 60 + 1);
        let err = build_plan(ProtocolType::Tabata, &cfg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "tabataRound.rest", .. }));
    }

    #[test]
    fn too_many_amrap_rounds_rejected() {
        let mut cfg = ProtocolConfig::amrap(600);
        for _ in 0..=MAX_ROUNDS {
            cfg = cfg.with_amrap_round(60, 0);
        }
        let err = build_plan(ProtocolType::Amrap, &cfg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "amrapRounds", .. }));
    }
}
