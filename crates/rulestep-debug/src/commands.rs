//! Debug console command processor
use crate::error::DebugError;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    /// Print relevant variables
    Vars,
    /// Clear the terminal transcript
    Clear,
    /// Toggle a breakpoint
    Break(u32),
    Run,
    Step,
    Continue,
    Stop,
    /// Source-map quality report
    Map,
}

/// Usage lines shown by `help`
pub const HELP: &[(&str, &str)] = &[
    ("help", "show this help"),
    ("vars", "list variables"),
    ("clear", "clear the terminal"),
    ("break <line>", "toggle a breakpoint"),
    ("r, run", "start execution"),
    ("s, step", "execute the current line"),
    ("c, continue", "run to the next breakpoint"),
    ("q, stop", "stop execution"),
    ("map", "source-map quality report"),
];

impl FromStr for Command {
    type Err = DebugError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = input.split_whitespace();
        let Some(verb) = parts.next() else {
            return Err(DebugError::UnknownCommand(String::new()));
        };
        let arg = parts.next();

        let command = match verb.to_lowercase().as_str() {
            "help" | "h" | "?" => Command::Help,
            "vars" | "v" => Command::Vars,
            "clear" => Command::Clear,
            "break" | "b" => {
                let raw = arg.ok_or_else(|| {
                    DebugError::InvalidArgument("usage: break <line>".to_string())
                })?;
                let line = raw.parse::<u32>().map_err(|_| {
                    DebugError::InvalidArgument(format!("`{raw}` is not a line number"))
                })?;
                Command::Break(line)
            }
            "r" | "run" => Command::Run,
            "s" | "step" => Command::Step,
            "c" | "continue" => Command::Continue,
            "q" | "stop" => Command::Stop,
            "map" => Command::Map,
            _ => return Err(DebugError::UnknownCommand(verb.to_string())),
        };
        Ok(command)
    }
}

pub fn help_text() -> String {
    HELP.iter()
        .map(|(usage, what)| format!("  {usage:<14} {what}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("help".parse::<Command>().unwrap(), Command::Help);
        assert_eq!(" break 5 ".parse::<Command>().unwrap(), Command::Break(5));
        assert_eq!("S".parse::<Command>().unwrap(), Command::Step);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Stop);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("break".parse::<Command>(), Err(DebugError::InvalidArgument(_))));
        assert!(matches!("break x".parse::<Command>(), Err(DebugError::InvalidArgument(_))));
        assert!(matches!("jump 3".parse::<Command>(), Err(DebugError::UnknownCommand(_))));
        assert!(matches!("".parse::<Command>(), Err(DebugError::UnknownCommand(_))));
    }
}
