//! Operator command console
//!
//! One command per line, whitespace separated:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `alarm <station> <up\|down>` | Mark a direction as approaching |
//! | `clear <station> <up\|down>` | Remove it and play the cleared cue |
//! | `play <name> [loop] [volume] [pitch]` | Play a sound |
//! | `stop <name>` | Stop a sound |
//! | `stopall` | Stop every sound |
//! | `volume <name> <v>` | Set a sound's volume |
//! | `pitch <name> <p>` | Set a sound's frequency ratio |
//! | `master <v>` | Set the master volume |
//! | `reload` | Reload the sound folder and restart loop sounds |
//! | `status` | Show engine state |
//! | `help` | List commands |
//! | `quit` | Exit |

use crate::controller::{PlayOutcome, StopOutcome};
use crate::engine::{AlarmEngine, StopAlarmOutcome};
use crate::error::Result;
use crate::reconcile::LOOP_MARKER;
use std::fmt::Write as _;
use std::str::FromStr;
use tatehama_common::{ActiveAlarm, Error as CommonError, Side};

/// Usage text printed by `help`
pub const HELP: &str = "\
commands:
  alarm <station> <up|down>
  clear <station> <up|down>
  play <name> [loop] [volume] [pitch]
  stop <name>
  stopall
  volume <name> <v>
  pitch <name> <p>
  master <v>
  reload
  status
  help
  quit";

/// A parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Alarm { station: String, side: Side },
    Clear { station: String, side: Side },
    Play {
        name: String,
        looping: bool,
        volume: f32,
        pitch: f32,
    },
    Stop { name: String },
    StopAll,
    Volume { name: String, volume: f32 },
    Pitch { name: String, pitch: f32 },
    Master { volume: f32 },
    Reload,
    Status,
    Help,
    Quit,
}

fn invalid(message: impl Into<String>) -> CommonError {
    CommonError::InvalidInput(message.into())
}

fn parse_number(word: &str, what: &str) -> std::result::Result<f32, CommonError> {
    match word.parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(invalid(format!("{} must be a finite number, got '{}'", what, word))),
    }
}

impl FromStr for Command {
    type Err = CommonError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Err(invalid("empty command"));
        };

        let expect_args = |count: usize, usage: &str| {
            if args.len() == count {
                Ok(())
            } else {
                Err(invalid(format!("usage: {}", usage)))
            }
        };

        match verb.to_ascii_lowercase().as_str() {
            "alarm" | "clear" => {
                expect_args(2, &format!("{} <station> <up|down>", verb))?;
                let station = args[0].to_string();
                let side: Side = args[1].parse()?;
                if verb.eq_ignore_ascii_case("alarm") {
                    Ok(Command::Alarm { station, side })
                } else {
                    Ok(Command::Clear { station, side })
                }
            }
            "play" => {
                let Some((&name, rest)) = args.split_first() else {
                    return Err(invalid("usage: play <name> [loop] [volume] [pitch]"));
                };
                let (looping, rest) = match rest.split_first() {
                    Some((&word, tail)) if word.eq_ignore_ascii_case("loop") => (true, tail),
                    _ => (false, rest),
                };
                if rest.len() > 2 {
                    return Err(invalid("usage: play <name> [loop] [volume] [pitch]"));
                }
                let volume = rest.first().map(|w| parse_number(w, "volume")).transpose()?;
                let pitch = rest.get(1).map(|w| parse_number(w, "pitch")).transpose()?;
                Ok(Command::Play {
                    name: name.to_string(),
                    looping,
                    volume: volume.unwrap_or(1.0),
                    pitch: pitch.unwrap_or(1.0),
                })
            }
            "stop" => {
                expect_args(1, "stop <name>")?;
                Ok(Command::Stop {
                    name: args[0].to_string(),
                })
            }
            "stopall" => {
                expect_args(0, "stopall")?;
                Ok(Command::StopAll)
            }
            "volume" => {
                expect_args(2, "volume <name> <v>")?;
                Ok(Command::Volume {
                    name: args[0].to_string(),
                    volume: parse_number(args[1], "volume")?,
                })
            }
            "pitch" => {
                expect_args(2, "pitch <name> <p>")?;
                Ok(Command::Pitch {
                    name: args[0].to_string(),
                    pitch: parse_number(args[1], "pitch")?,
                })
            }
            "master" => {
                expect_args(1, "master <v>")?;
                Ok(Command::Master {
                    volume: parse_number(args[0], "volume")?,
                })
            }
            "reload" => Ok(Command::Reload),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(invalid(format!("unknown command '{}' (try 'help')", other))),
        }
    }
}

/// Run a command against the engine and return the reply for the operator.
///
/// `Quit` is not acted on here; the caller decides how to exit.
pub async fn execute(engine: &AlarmEngine, command: Command) -> Result<String> {
    let reply = match command {
        Command::Alarm { station, side } => {
            engine.state().add_active_alarm(ActiveAlarm::new(&station, side));
            format!("alarm active: {} {}", station, side)
        }
        Command::Clear { station, side } => {
            let removed = engine.state().remove_active_alarm(&station, side);
            match engine.loop_sound_all_stop(&station, side)? {
                StopAlarmOutcome::Cleared(cue) => {
                    format!("alarm cleared: {} {} ({} removed, cue {})", station, side, removed, play_text(cue))
                }
                StopAlarmOutcome::UnknownStation => {
                    format!("no configuration for station '{}' ({} removed)", station, removed)
                }
            }
        }
        Command::Play {
            name,
            looping,
            volume,
            pitch,
        } => {
            let outcome = engine.sound_play(&name, looping, volume, pitch)?;
            format!("{}: {}", name, play_text(outcome))
        }
        Command::Stop { name } => {
            let text = match engine.sound_stop(&name)? {
                StopOutcome::Stopped => "stopped",
                StopOutcome::AlreadyIdle => "already idle",
                StopOutcome::UnknownAsset => "unknown sound",
            };
            format!("{}: {}", name, text)
        }
        Command::StopAll => {
            engine.sound_all_stop();
            "all sounds stopped".to_string()
        }
        Command::Volume { name, volume } => {
            if engine.set_volume(&name, volume) {
                format!("{}: volume {:.2}", name, engine.asset_volume(&name).unwrap_or(0.0))
            } else {
                format!("{}: unknown sound", name)
            }
        }
        Command::Pitch { name, pitch } => {
            if engine.set_pitch(&name, pitch) {
                format!("{}: pitch {:.2}", name, pitch)
            } else {
                format!("{}: unknown sound", name)
            }
        }
        Command::Master { volume } => {
            engine.set_master_volume(volume);
            format!("master volume {:.2}", engine.master_volume())
        }
        Command::Reload => {
            let (report, started) = engine.reload().await?;
            format!(
                "reloaded {} sounds from {} ({} skipped, {} loops started)",
                report.loaded,
                report.folder.display(),
                report.failures.len(),
                started
            )
        }
        Command::Status => status(engine),
        Command::Help => HELP.to_string(),
        Command::Quit => "bye".to_string(),
    };
    Ok(reply)
}

fn play_text(outcome: PlayOutcome) -> &'static str {
    match outcome {
        PlayOutcome::Played => "playing",
        PlayOutcome::AlreadyPlaying => "already playing",
        PlayOutcome::UnknownAsset => "unknown sound",
    }
}

fn status(engine: &AlarmEngine) -> String {
    let state = engine.state();
    let names = engine.sound_names();
    let alarms = state.active_alarms();

    let mut out = String::new();
    let _ = writeln!(out, "device: {}", engine.device_name());
    let _ = writeln!(out, "master volume: {:.2}", engine.master_volume());
    let _ = writeln!(out, "blink: {}", if state.blink_flag() { "on" } else { "off" });
    let _ = writeln!(out, "sounds loaded: {}", names.len());

    let _ = writeln!(out, "active alarms: {}", alarms.len());
    for alarm in alarms.iter() {
        let _ = writeln!(out, "  {} {}", alarm.station_name, alarm.side);
    }

    for name in names.iter().filter(|n| n.contains(LOOP_MARKER)) {
        if let Some(voice) = engine.voice_status(name) {
            let _ = writeln!(
                out,
                "  {:<24} volume {:.2} {}",
                name,
                voice.volume,
                if voice.running { "running" } else { "stopped" }
            );
        }
    }

    out.trim_end().to_string()
}
