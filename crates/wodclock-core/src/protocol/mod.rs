//! Interval protocols and their configuration.
//!
//! A [`ProtocolConfig`] is the raw form input for one protocol. It is consumed
//! once by [`build_plan`] to produce an immutable [`SessionPlan`].
//!
//! Units: primary durations (`duration`, `work`, `rest`, extra AMRAP round
//! durations) are seconds. Rests attached to extra rounds are minutes.

mod builder;
mod plan;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use builder::{build_plan, MAX_DURATION_SECS, MAX_ROUNDS};
pub use plan::{PlannedSession, Repeat, Segment, SegmentKind, Session, SessionPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolType {
    /// Stopwatch, optionally capped.
    ForTime,
    /// Fixed-duration rounds.
    Amrap,
    /// Fixed-interval cueing.
    Emom,
    /// Fixed work/rest cycles.
    Tabata,
}

impl ProtocolType {
    pub const ALL: [ProtocolType; 4] = [
        ProtocolType::ForTime,
        ProtocolType::Amrap,
        ProtocolType::Emom,
        ProtocolType::Tabata,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolType::ForTime => "FOR_TIME",
            ProtocolType::Amrap => "AMRAP",
            ProtocolType::Emom => "EMOM",
            ProtocolType::Tabata => "TABATA",
        }
    }
}

impl fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolType {
    type Err = String;

    /// Accepts `FOR_TIME`, `for-time`, `fortime` and friends.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match norm.as_str() {
            "fortime" => Ok(ProtocolType::ForTime),
            "amrap" => Ok(ProtocolType::Amrap),
            "emom" => Ok(ProtocolType::Emom),
            "tabata" => Ok(ProtocolType::Tabata),
            _ => Err(format!("unknown protocol: {s}")),
        }
    }
}

/// Extra TABATA block appended after the primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabataRound {
    /// Number of work/rest cycles in the extra block.
    pub round: u32,
    /// Rest before the extra block, in minutes.
    pub rest: u64,
}

/// Extra AMRAP block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmrapRound {
    /// Block length in seconds.
    pub duration: u64,
    /// Rest in minutes. Applied after the *preceding* block, not after this one.
    pub rest: u64,
}

/// Extra EMOM block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmomRound {
    /// Number of intervals in the extra block.
    pub round: u32,
    /// Rest before the extra block, in minutes.
    pub rest: u64,
}

/// Type-dependent parameters for one protocol.
///
/// Which fields are required depends on the [`ProtocolType`] handed to
/// [`build_plan`]; the rest are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolConfig {
    /// Seconds. Time cap (FOR_TIME), block length (AMRAP), total length (EMOM).
    #[serde(default)]
    pub duration: Option<u64>,
    /// TABATA cycle count.
    #[serde(default)]
    pub rounds: Option<u32>,
    /// TABATA work seconds.
    #[serde(default)]
    pub work: Option<u64>,
    /// TABATA rest seconds.
    #[serde(default)]
    pub rest: Option<u64>,
    /// EMOM interval; one minute when absent.
    #[serde(default)]
    pub interval_minutes: Option<u32>,
    /// FOR_TIME without a cap.
    #[serde(default)]
    pub open_time_cap: bool,
    /// EMOM "death by": intervals continue until cancelled.
    #[serde(default)]
    pub death_by: bool,
    #[serde(default)]
    pub tabata_round: Option<TabataRound>,
    #[serde(default)]
    pub amrap_rounds: Option<Vec<AmrapRound>>,
    #[serde(default)]
    pub emom_round: Option<EmomRound>,
}

impl ProtocolConfig {
    pub fn for_time(cap_secs: Option<u64>) -> Self {
        Self {
            duration: cap_secs,
            open_time_cap: cap_secs.is_none(),
            ..Self::default()
        }
    }

    pub fn amrap(duration_secs: u64) -> Self {
        Self {
            duration: Some(duration_secs),
            ..Self::default()
        }
    }

    pub fn emom(duration_secs: u64, interval_minutes: u32) -> Self {
        Self {
            duration: Some(duration_secs),
            interval_minutes: Some(interval_minutes),
            ..Self::default()
        }
    }

    pub fn death_by(interval_minutes: u32) -> Self {
        Self {
            interval_minutes: Some(interval_minutes),
            death_by: true,
            ..Self::default()
        }
    }

    pub fn tabata(rounds: u32, work_secs: u64, rest_secs: u64) -> Self {
        Self {
            rounds: Some(rounds),
            work: Some(work_secs),
            rest: Some(rest_secs),
            ..Self::default()
        }
    }

    pub fn with_tabata_round(mut self, round: u32, rest_min: u64) -> Self {
        self.tabata_round = Some(TabataRound { round, rest: rest_min });
        self
    }

    pub fn with_amrap_round(mut self, duration_secs: u64, rest_min: u64) -> Self {
        self.amrap_rounds
            .get_or_insert_with(Vec::new)
            .push(AmrapRound {
                duration: duration_secs,
                rest: rest_min,
            });
        self
    }

    pub fn with_emom_round(mut self, round: u32, rest_min: u64) -> Self {
        self.emom_round = Some(EmomRound { round, rest: rest_min });
        self
    }
}
