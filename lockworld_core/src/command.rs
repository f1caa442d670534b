//! Textual commands as issued by a driver.
//!
//! Accepts the call syntax `MOVETO(gem)` / `OPENDOOR(room_a, key_a)` as well as
//! a plain `goto gem` / `open room_a key_a` form.

use std::{fmt, str::FromStr};

use crate::error::CommandError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Explore,
    Goto(String),
    Pick(String),
    Drop(String),
    Open { door: String, key: String },
    Finished,
}

fn strip_quotes(arg: &str) -> &str {
    arg.trim()
        .trim_matches(|c| matches!(c, '\'' | '"' | '`'))
        .trim()
}

fn expect_args(command: &'static str, args: &[&str], expected: usize) -> Result<(), CommandError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(CommandError::Arity {
            command,
            expected,
            found: args.len(),
        })
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CommandError::Empty);
        }

        let (verb, args): (&str, Vec<&str>) = match input.split_once('(') {
            Some((verb, rest)) => {
                let inner = rest
                    .strip_suffix(')')
                    .ok_or_else(|| CommandError::Malformed(input.to_string()))?;
                let args = inner
                    .split(',')
                    .map(strip_quotes)
                    .filter(|arg| !arg.is_empty())
                    .collect();
                (verb.trim(), args)
            }
            None => {
                let mut words = input.split_whitespace();
                let verb = words.next().unwrap_or_default();
                (verb, words.map(strip_quotes).collect())
            }
        };

        match verb.to_ascii_uppercase().as_str() {
            "EXPLORE" => {
                expect_args("EXPLORE", &args, 0)?;
                Ok(Command::Explore)
            }
            "MOVETO" | "GOTO" => {
                expect_args("MOVETO", &args, 1)?;
                Ok(Command::Goto(args[0].to_string()))
            }
            "PICKUP" | "PICK" => {
                expect_args("PICKUP", &args, 1)?;
                Ok(Command::Pick(args[0].to_string()))
            }
            "PUTDOWN" | "DROP" => {
                expect_args("PUTDOWN", &args, 1)?;
                Ok(Command::Drop(args[0].to_string()))
            }
            "OPENDOOR" | "OPEN" => {
                expect_args("OPENDOOR", &args, 2)?;
                Ok(Command::Open {
                    door: args[0].to_string(),
                    key: args[1].to_string(),
                })
            }
            "FINISHED" => {
                expect_args("FINISHED", &args, 0)?;
                Ok(Command::Finished)
            }
            _ => Err(CommandError::Unknown(verb.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Explore => write!(f, "EXPLORE()"),
            Command::Goto(target) => write!(f, "MOVETO({target})"),
            Command::Pick(item) => write!(f, "PICKUP({item})"),
            Command::Drop(item) => write!(f, "PUTDOWN({item})"),
            Command::Open { door, key } => write!(f, "OPENDOOR({door}, {key})"),
            Command::Finished => write!(f, "FINISHED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_syntax() {
        assert_eq!("EXPLORE()".parse(), Ok(Command::Explore));
        assert_eq!("MOVETO(gem)".parse(), Ok(Command::Goto("gem".into())));
        assert_eq!("PICKUP('key_a')".parse(), Ok(Command::Pick("key_a".into())));
        assert_eq!("PUTDOWN(\"gem\")".parse(), Ok(Command::Drop("gem".into())));
        assert_eq!(
            "OPENDOOR(room_a, key_a)".parse(),
            Ok(Command::Open {
                door: "room_a".into(),
                key: "key_a".into()
            })
        );
        assert_eq!("FINISHED".parse(), Ok(Command::Finished));
    }

    #[test]
    fn test_word_syntax() {
        assert_eq!("goto gem".parse(), Ok(Command::Goto("gem".into())));
        assert_eq!("  explore ".parse(), Ok(Command::Explore));
        assert_eq!(
            "open room_a key_a".parse(),
            Ok(Command::Open {
                door: "room_a".into(),
                key: "key_a".into()
            })
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!(
            "DANCE()".parse::<Command>(),
            Err(CommandError::Unknown("DANCE".into()))
        );
        assert_eq!(
            "PICKUP()".parse::<Command>(),
            Err(CommandError::Arity {
                command: "PICKUP",
                expected: 1,
                found: 0
            })
        );
        assert!(matches!(
            "MOVETO(gem".parse::<Command>(),
            Err(CommandError::Malformed(_))
        ));
    }

    #[test]
    fn test_display_parses_back() {
        let command = Command::Open {
            door: "room_a".into(),
            key: "key_a".into(),
        };
        assert_eq!(command.to_string().parse(), Ok(command));
    }
}
