//! Operator console: line commands on stdin and human-readable reports.
//!
//! Rendering is kept in pure functions returning `String` so the output
//! can be tested without a terminal.

use std::fmt::Write as _;
use std::time::Duration;

use buzzer_core::{Engine, EpochSummary};
use buzzer_loadgen::LoadReport;
use buzzer_types::StatsSnapshot;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::AppError;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the current statistics.
    Stats,
    /// Start a new round.
    Reset,
    /// Print the current winner.
    Winner,
    /// List the commands.
    Help,
    /// Leave the console and shut down.
    Exit,
    /// Blank line.
    Empty,
    /// Anything else.
    Unknown(String),
}

impl Command {
    /// Parse one input line. Case and surrounding whitespace are ignored.
    pub fn parse(line: &str) -> Self {
        let cmd = line.trim().to_lowercase();
        match cmd.as_str() {
            "" => Self::Empty,
            "stats" => Self::Stats,
            "reset" => Self::Reset,
            "winner" => Self::Winner,
            "help" | "?" => Self::Help,
            "exit" | "quit" => Self::Exit,
            _ => Self::Unknown(cmd),
        }
    }
}

/// Command reference printed at start-up and on `help`.
pub const HELP: &str = "\
Available commands:
  stats   - Show current statistics
  reset   - Start a new round
  winner  - Show the current winner
  help    - Show this list
  exit    - Shut down the server";

/// Read commands from stdin until `exit`/`quit`.
///
/// Stdin is read on a dedicated OS thread so a pending read never holds
/// up runtime shutdown. If stdin closes, the console goes quiet and this
/// future never resolves; the process then stops on Ctrl-C.
pub async fn run(engine: &Engine) -> Result<(), AppError> {
    let (tx, mut rx) = mpsc::channel::<String>(16);
    std::thread::Builder::new()
        .name(String::from("console-stdin"))
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
            debug!("Console reader thread exiting");
        })?;

    while let Some(line) = rx.recv().await {
        match Command::parse(&line) {
            Command::Stats => println!("{}", render_stats(&engine.get_stats())),
            Command::Reset => println!("{}", render_reset(&engine.reset())),
            Command::Winner => println!("{}", render_winner(&engine.get_stats())),
            Command::Help => println!("{HELP}"),
            Command::Exit => return Ok(()),
            Command::Empty => {}
            Command::Unknown(cmd) => println!("Unknown command: {cmd} (try `help`)"),
        }
    }

    info!("Console input closed; press Ctrl-C to stop");
    std::future::pending::<()>().await;
    Ok(())
}

/// Render the statistics block.
pub fn render_stats(stats: &StatsSnapshot) -> String {
    let mut out = String::from("== Current statistics ==\n");
    let _ = writeln!(out, "Total responses:   {}", stats.total_responses);
    let _ = writeln!(out, "Correct responses: {}", stats.correct_responses);
    if let Some(pct) = stats.correct_percentage {
        let _ = writeln!(out, "Success rate:      {pct:.1}%");
    }
    let _ = writeln!(out, "Duration:          {:.1}s", stats.game_duration_secs);
    if stats.inline_processed > 0 {
        let _ = writeln!(out, "Inline processed:  {}", stats.inline_processed);
    }
    out.push_str(&render_winner(stats));
    out
}

/// Render the winner line(s).
pub fn render_winner(stats: &StatsSnapshot) -> String {
    stats.winner.as_ref().map_or_else(
        || String::from("No winner yet"),
        |w| {
            format!(
                "Winner: user {} with answer '{}' after {:.3}s",
                w.participant_id, w.answer, w.time_to_win_secs
            )
        },
    )
}

/// Render the summary of a closed round.
pub fn render_reset(summary: &EpochSummary) -> String {
    let mut out = String::from("== Game reset ==\n");
    match &summary.winner {
        Some(w) => {
            let _ = writeln!(out, "Previous winner:   user {}", w.participant_id);
        }
        None => out.push_str("Previous winner:   none\n"),
    }
    let _ = writeln!(out, "Total responses:   {}", summary.total_count);
    let _ = write!(out, "Correct responses: {}", summary.correct_count);
    if let Some(pct) = summary.correct_percentage() {
        let _ = write!(out, "\nSuccess rate:      {pct:.1}%");
    }
    out
}

/// Render the load generator report.
pub fn render_load_report(report: &LoadReport) -> String {
    let mut out = String::from("== Simulation complete ==\n");
    let _ = writeln!(out, "Users:             {}", report.users);
    let _ = writeln!(out, "Sent:              {}", report.sent);
    let _ = writeln!(out, "Failed:            {}", report.failed);
    let _ = writeln!(out, "Duration:          {}", format_duration(report.elapsed));
    let per_user = report.elapsed.checked_div(report.users).unwrap_or_default();
    let _ = write!(out, "Avg time/user:     {}", format_duration(per_user));
    out
}

/// Render the end-of-run results of `full` mode.
pub fn render_final(stats: &StatsSnapshot, total_time: Duration) -> String {
    let mut out = String::from("== Final results ==\n");
    match &stats.winner {
        Some(w) => {
            let _ = writeln!(out, "WINNER: user {} with answer '{}'", w.participant_id, w.answer);
            let _ = writeln!(out, "Time to win:       {:.3}s", w.time_to_win_secs);
        }
        None => out.push_str("No winner found (no correct answers)\n"),
    }
    let _ = writeln!(out, "Total responses:   {}", stats.total_responses);
    let _ = writeln!(out, "Correct responses: {}", stats.correct_responses);
    if let Some(pct) = stats.correct_percentage {
        let _ = writeln!(out, "Success rate:      {pct:.2}%");
    }
    let _ = write!(out, "Total time:        {:.3}s", total_time.as_secs_f64());
    out
}

fn format_duration(d: Duration) -> String {
    format!("{:.3}s", d.as_secs_f64())
}
