use clap::Args;
use serde_json::json;
use wodclock_core::protocol::{AmrapRound, EmomRound, TabataRound};
use wodclock_core::storage::PresetSettings;
use wodclock_core::{build_plan, ProtocolConfig, ProtocolType, Settings};

/// Protocol selection and form values, shared by `plan` and `run`.
#[derive(Args, Debug, Clone)]
pub struct ProtocolArgs {
    /// for-time, amrap, emom or tabata
    pub protocol: ProtocolType,
    /// Total (or capped) duration in seconds
    #[arg(long)]
    pub duration: Option<u64>,
    /// TABATA rounds
    #[arg(long)]
    pub rounds: Option<u32>,
    /// TABATA work seconds
    #[arg(long)]
    pub work: Option<u64>,
    /// TABATA rest seconds
    #[arg(long)]
    pub rest: Option<u64>,
    /// EMOM interval in minutes
    #[arg(long)]
    pub interval: Option<u32>,
    /// FOR TIME with no cap
    #[arg(long)]
    pub open_cap: bool,
    /// EMOM that repeats until stopped
    #[arg(long)]
    pub death_by: bool,
    /// Rounds in an extra TABATA/EMOM block
    #[arg(long)]
    pub extra_rounds: Option<u32>,
    /// Minutes of rest before the extra block
    #[arg(long)]
    pub extra_rest: Option<u64>,
    /// Extra AMRAP block as SECONDS:REST_MINUTES (repeatable)
    #[arg(long = "amrap-round", value_parser = parse_amrap_round)]
    pub amrap_rounds: Vec<AmrapRound>,
    /// Do not fill missing values from the saved presets
    #[arg(long)]
    pub no_presets: bool,
}

fn parse_amrap_round(s: &str) -> Result<AmrapRound, String> {
    let (duration, rest) = s
        .split_once(':')
        .ok_or_else(|| format!("expected SECONDS:REST_MINUTES, got '{s}'"))?;
    let duration = duration
        .trim()
        .parse()
        .map_err(|e| format!("bad duration '{duration}': {e}"))?;
    let rest = rest
        .trim()
        .parse()
        .map_err(|e| format!("bad rest '{rest}': {e}"))?;
    Ok(AmrapRound { duration, rest })
}

impl ProtocolArgs {
    /// Build the configuration the form would submit.
    ///
    /// # Errors
    /// Returns a usage message when a flag does not apply to the protocol.
    pub fn to_config(&self, presets: &PresetSettings) -> Result<ProtocolConfig, String> {
        let mut config = if self.no_presets {
            ProtocolConfig::default()
        } else {
            match self.protocol {
                ProtocolType::ForTime => ProtocolConfig::default(),
                ProtocolType::Amrap => presets.amrap(),
                ProtocolType::Emom => presets.emom(),
                ProtocolType::Tabata => presets.tabata(),
            }
        };

        if self.duration.is_some() {
            config.duration = self.duration;
        }
        if self.rounds.is_some() {
            config.rounds = self.rounds;
        }
        if self.work.is_some() {
            config.work = self.work;
        }
        if self.rest.is_some() {
            config.rest = self.rest;
        }
        if self.interval.is_some() {
            config.interval_minutes = self.interval;
        }
        config.open_time_cap = self.open_cap
            || (self.protocol == ProtocolType::ForTime && config.duration.is_none());
        config.death_by = self.death_by;

        if self.extra_rounds.is_some() || self.extra_rest.is_some() {
            let Some(round) = self.extra_rounds else {
                return Err("--extra-rest needs --extra-rounds".into());
            };
            let rest = self.extra_rest.unwrap_or(0);
            match self.protocol {
                ProtocolType::Tabata => config.tabata_round = Some(TabataRound { round, rest }),
                ProtocolType::Emom => config.emom_round = Some(EmomRound { round, rest }),
                ProtocolType::Amrap => {
                    return Err(
                        "--extra-rounds/--extra-rest do not apply to amrap; use --amrap-round SECONDS:REST_MINUTES"
                            .into(),
                    )
                }
                ProtocolType::ForTime => {
                    return Err("--extra-rounds/--extra-rest do not apply to for-time".into())
                }
            }
        }
        if !self.amrap_rounds.is_empty() {
            if self.protocol != ProtocolType::Amrap {
                return Err(format!("--amrap-round does not apply to {}", self.protocol));
            }
            config.amrap_rounds = Some(self.amrap_rounds.clone());
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub protocol: ProtocolArgs,
}

pub fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load_or_default();
    let config = args.protocol.to_config(&settings.presets)?;
    let plan = build_plan(args.protocol.protocol, &config)?;

    let output = json!({
        "protocol": plan.protocol(),
        "config": config,
        "sessions": plan.sessions(),
        "session_count": plan.len(),
        "total_secs": plan.total_secs(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(protocol: ProtocolType) -> ProtocolArgs {
        ProtocolArgs {
            protocol,
            duration: None,
            rounds: None,
            work: None,
            rest: None,
            interval: None,
            open_cap: false,
            death_by: false,
            extra_rounds: None,
            extra_rest: None,
            amrap_rounds: Vec::new(),
            no_presets: false,
        }
    }

    #[test]
    fn amrap_round_parses_seconds_and_minutes() {
        assert_eq!(
            parse_amrap_round("600:2").unwrap(),
            AmrapRound {
                duration: 600,
                rest: 2
            }
        );
        assert!(parse_amrap_round("600").is_err());
        assert!(parse_amrap_round("x:1").is_err());
    }

    #[test]
    fn presets_fill_missing_values() {
        let mut a = args(ProtocolType::Tabata);
        a.work = Some(40);
        let config = a.to_config(&PresetSettings::default()).unwrap();
        assert_eq!(config.rounds, Some(8));
        assert_eq!(config.work, Some(40));
        assert_eq!(config.rest, Some(10));
    }

    #[test]
    fn no_presets_leaves_fields_empty() {
        let mut a = args(ProtocolType::Amrap);
        a.no_presets = true;
        assert_eq!(a.to_config(&PresetSettings::default()).unwrap().duration, None);
    }

    #[test]
    fn extra_rounds_follow_the_protocol() {
        let mut a = args(ProtocolType::Emom);
        a.extra_rounds = Some(4);
        a.extra_rest = Some(1);
        let config = a.to_config(&PresetSettings::default()).unwrap();
        assert_eq!(config.emom_round, Some(EmomRound { round: 4, rest: 1 }));
        assert_eq!(config.tabata_round, None);
    }

    #[test]
    fn for_time_without_cap_is_open() {
        let config = args(ProtocolType::ForTime)
            .to_config(&PresetSettings::default())
            .unwrap();
        assert!(config.open_time_cap);
        let mut capped = args(ProtocolType::ForTime);
        capped.duration = Some(900);
        assert!(!capped.to_config(&PresetSettings::default()).unwrap().open_time_cap);
    }

    #[test]
    fn extra_round_flags_rejected_where_they_do_not_apply() {
        for protocol in [ProtocolType::Amrap, ProtocolType::ForTime] {
            let mut a = args(protocol);
            a.extra_rounds = Some(2);
            a.extra_rest = Some(1);
            assert!(a.to_config(&PresetSettings::default()).is_err(), "{protocol}");
        }

        let mut amrap = args(ProtocolType::Amrap);
        amrap.extra_rounds = Some(2);
        let err = amrap.to_config(&PresetSettings::default()).unwrap_err();
        assert!(err.contains("--amrap-round"), "{err}");

        let mut rest_only = args(ProtocolType::Tabata);
        rest_only.extra_rest = Some(1);
        assert!(rest_only.to_config(&PresetSettings::default()).is_err());

        let mut stray = args(ProtocolType::Tabata);
        stray.amrap_rounds = vec![AmrapRound {
            duration: 60,
            rest: 1,
        }];
        assert!(stray.to_config(&PresetSettings::default()).is_err());
    }
}
