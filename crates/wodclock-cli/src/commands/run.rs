use std::future::Future;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use clap::Args;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, warn};
use wodclock_core::{Event, Settings, SystemClock, TimerWidget, WidgetState};

use super::plan::ProtocolArgs;

/// Wake-up interval while nothing is ticking (paused).
const IDLE_WAIT: Duration = Duration::from_millis(250);

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub protocol: ProtocolArgs,
    /// Workout identifier carried into the completion record
    #[arg(long)]
    pub label: Option<String>,
    /// Ignore stdin; run until complete or Ctrl-C
    #[arg(long)]
    pub no_input: bool,
    /// Skip per-tick time_update lines
    #[arg(long)]
    pub quiet: bool,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(drive(args))
}

async fn drive(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load_or_default();
    let config = args.protocol.to_config(&settings.presets)?;
    let mut widget = TimerWidget::from_settings(Rc::new(SystemClock), &settings);
    let mut printer = Printer { quiet: args.quiet };

    let mut opening = Vec::new();
    opening.extend(widget.open_menu());
    opening.extend(widget.select_type(args.protocol.protocol));
    opening.extend(widget.start_timer(&config, args.label.clone())?);
    printer.emit(&opening)?;

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let result = event_loop(
        &mut widget,
        &mut printer,
        lines,
        !args.no_input,
        tokio::signal::ctrl_c(),
    )
    .await;

    widget.shutdown();
    result
}

/// Drive `widget` until the run completes, is stopped, or `shutdown` resolves.
///
/// `shutdown` is polled as one future across iterations, so a signal raised
/// while a tick is being handled is still seen on the next pass.
async fn event_loop<R, S>(
    widget: &mut TimerWidget,
    printer: &mut Printer,
    mut lines: Lines<R>,
    mut input_open: bool,
    shutdown: S,
) -> Result<(), Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin,
    S: Future,
{
    tokio::pin!(shutdown);

    loop {
        if widget.is_complete() {
            printer.emit(&widget.acknowledge_completion())?;
            break;
        }
        if widget.state() == WidgetState::Badge {
            break;
        }

        let wait = widget.until_next_tick().unwrap_or(IDLE_WAIT);
        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                printer.emit(&widget.poll())?;
            }
            line = lines.next_line(), if input_open => {
                match line? {
                    Some(line) => printer.emit(&apply_command(widget, line.trim()))?,
                    None => {
                        debug!("stdin closed, input disabled");
                        input_open = false;
                    }
                }
            }
            _ = &mut shutdown => {
                printer.emit(&widget.cancel())?;
                break;
            }
        }
    }
    Ok(())
}

/// Map one stdin line onto a widget intent.
fn apply_command(widget: &mut TimerWidget, command: &str) -> Vec<Event> {
    match command {
        "" => Vec::new(),
        "p" | "pause" => widget.pause().into_iter().collect(),
        "r" | "resume" => widget.resume().into_iter().collect(),
        "m" | "minimize" => widget.minimize_timer().into_iter().collect(),
        "x" | "maximize" => widget.maximize_timer().into_iter().collect(),
        "s" | "status" => vec![widget.snapshot()],
        "q" | "quit" | "stop" => widget.stop_timer(),
        other => {
            warn!(command = other, "unknown command (p, r, m, x, s, q)");
            Vec::new()
        }
    }
}

struct Printer {
    quiet: bool,
}

impl Printer {
    fn emit(&mut self, events: &[Event]) -> Result<(), Box<dyn std::error::Error>> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for event in events {
            if self.quiet && matches!(event, Event::TimeUpdate(_) | Event::RestTick { .. }) {
                continue;
            }
            writeln!(out, "{}", serde_json::to_string(event)?)?;
        }
        out.flush()?;
        Ok(())
    }
}
