//! Operator console: menu, one command per line, blocking.
//!
//! Generic over the input and output streams so tests can drive it with
//! in-memory buffers; the binary hands it locked stdin/stdout.  End of
//! input behaves like `x`.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use log::error;

use crate::error::IntervalError;

use super::agent::Agent;
use super::commands::LocalCommand;
use super::events::AppEvent;

const RULE: &str = "---------------";

/// Whether the console loop keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct CommandDispatcher<R, W> {
    agent: Arc<Agent>,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> CommandDispatcher<R, W> {
    pub fn new(agent: Arc<Agent>, input: R, output: W) -> Self {
        Self {
            agent,
            input,
            output,
        }
    }

    /// Show the menu and execute commands until `x`, end of input, or an
    /// external shutdown.
    pub fn run(&mut self) -> io::Result<()> {
        while !self.agent.is_shut_down() {
            self.print_menu()?;
            let Some(line) = read_line(&mut self.input)? else {
                writeln!(self.output)?;
                self.execute(&LocalCommand::Exit)?;
                break;
            };
            if self.execute(&LocalCommand::parse(&line))? == Flow::Exit {
                break;
            }
        }
        self.output.flush()
    }

    pub fn print_menu(&mut self) -> io::Result<()> {
        let name = self.agent.actuator().name();
        let toggle_to = if self.agent.actuator().is_on() {
            "Off"
        } else {
            "On"
        };
        let transmit = if self.agent.is_transmitting() {
            "Stop Transmitting"
        } else {
            "Transmit"
        };
        let interval = self.agent.transmit().interval();

        let out = &mut self.output;
        writeln!(out, "{RULE}")?;
        writeln!(out, "RTDMS v1.0 Menu")?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "\"S\": - display current temperature/pressure")?;
        writeln!(out, "\"H\": - turn {name} {toggle_to}")?;
        writeln!(out, "\"T\": - {transmit} Telemetry To IoT Hub service")?;
        writeln!(
            out,
            "\"I\": - Change telemetry transmit interval (currently {interval}ms)"
        )?;
        writeln!(out, "\"X\": - Close the RTDMS agent")?;
        write!(out, "Command:-> ")?;
        out.flush()
    }

    pub fn execute(&mut self, command: &LocalCommand) -> io::Result<Flow> {
        let Self {
            agent,
            input,
            output,
        } = self;

        match command {
            LocalCommand::Exit => {
                writeln!(output, "Exiting RTDMS...")?;
                output.flush()?;
                agent.shutdown();
                return Ok(Flow::Exit);
            }
            LocalCommand::ToggleActuator => {
                agent.actuator().toggle();
            }
            LocalCommand::ToggleTransmit => {
                if let Err(e) = agent.toggle_transmit() {
                    error!("Could not start telemetry publisher: {}", e);
                    writeln!(output, "Unable to start telemetry: {e}")?;
                }
            }
            LocalCommand::ChangeInterval => {
                let result = agent.transmit().reconfigure(|| {
                    write!(output, "New polling rate (ms)? ")
                        .and_then(|()| output.flush())
                        .map_err(|e| IntervalError::Input(e.to_string()))?;
                    read_line(input)
                        .map_err(|e| IntervalError::Input(e.to_string()))?
                        .ok_or_else(|| IntervalError::Input("end of input".into()))
                });
                match result {
                    Ok(ms) => {
                        writeln!(output, "Polling rate set to {ms}ms")?;
                        agent.events().emit(&AppEvent::IntervalChanged(ms.get()));
                    }
                    Err(e) => writeln!(output, "{e}")?,
                }
            }
            LocalCommand::Status => {
                let status = agent.status();
                writeln!(output, "DEVICE STATUS")?;
                writeln!(output, "-------------")?;
                writeln!(
                    output,
                    "{}: {}",
                    agent.actuator().name(),
                    if status.actuator_on { "ON" } else { "OFF" }
                )?;
                writeln!(output, "Temperature: {:.1}dF", status.reading.temperature_f)?;
                writeln!(output, "Pressure: {:.2}kPa", status.reading.pressure_kpa)?;
            }
            LocalCommand::Unknown(_) => {
                writeln!(output, "Unknown command")?;
            }
        }
        Ok(Flow::Continue)
    }
}

/// One line without its terminator; `None` at end of input.
fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed_len);
    Ok(Some(line))
}
