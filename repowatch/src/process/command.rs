//! Structured command descriptors

use std::fmt;

use serde::{Deserialize, Serialize};

/// A program and its argument list.
///
/// Configuration may spell a command either as `{"program": .., "args": [..]}`
/// or as a single line such as `"npm run build"`, which is split on
/// whitespace. Quoting is not interpreted in the line form; use the
/// structured form when an argument contains spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCommand")]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, A>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a whitespace separated command line. Returns `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program, parts))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCommand {
    Line(String),
    Structured {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl TryFrom<RawCommand> for CommandSpec {
    type Error = String;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        match raw {
            RawCommand::Line(line) => {
                CommandSpec::parse(&line).ok_or_else(|| "command line is empty".to_string())
            }
            RawCommand::Structured { program, args } => {
                if program.trim().is_empty() {
                    return Err("command program is empty".to_string());
                }
                Ok(CommandSpec { program, args })
            }
        }
    }
}
