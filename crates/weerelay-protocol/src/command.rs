//! Outbound commands.
//!
//! The client speaks plain text to the relay: one command per line,
//! optionally prefixed by an identifier in parentheses that the relay
//! echoes back as the reply's [`Message::identifier`](crate::Message).
//!
//! ```text
//! (listbuffers) hdata buffer:gui_buffers(*) number,full_name\n
//! ```
//!
//! Encoding validates every argument: a stray newline would split one
//! command into two, so it is an error rather than something to escape.

use std::fmt::Write as _;

use crate::ProtocolError;

/// A relay command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Authenticate and choose whether the relay compresses replies.
    Init { password: String, compression: bool },
    /// Request hdata along `path`, optionally restricted to `keys`.
    Hdata { path: String, keys: Option<String> },
    /// Request one info value.
    Info { name: String },
    /// Request an infolist.
    Infolist {
        name: String,
        pointer: Option<String>,
        arguments: Option<String>,
    },
    /// Request the nicklist of one buffer, or of all buffers.
    Nicklist { buffer: Option<String> },
    /// Send text or a command to a buffer, as if typed there.
    Input { buffer: String, data: String },
    /// Subscribe to updates for some or all buffers.
    Sync {
        buffers: Option<String>,
        options: Option<String>,
    },
    /// Undo a `sync`.
    Desync {
        buffers: Option<String>,
        options: Option<String>,
    },
    /// Ask the relay for its sample message covering every type.
    Test,
    /// Ask the relay to echo `arguments` back in a `_pong` message.
    Ping { arguments: Option<String> },
    /// Close the session.
    Quit,
}

impl Command {
    /// The command word as written on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Hdata { .. } => "hdata",
            Self::Info { .. } => "info",
            Self::Infolist { .. } => "infolist",
            Self::Nicklist { .. } => "nicklist",
            Self::Input { .. } => "input",
            Self::Sync { .. } => "sync",
            Self::Desync { .. } => "desync",
            Self::Test => "test",
            Self::Ping { .. } => "ping",
            Self::Quit => "quit",
        }
    }

    /// Encodes the command as one `\n`-terminated line with no identifier.
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        Request::new(self.clone()).to_line()
    }

    fn write_args(&self, line: &mut String) -> Result<(), ProtocolError> {
        match self {
            Self::Init {
                password,
                compression,
            } => {
                option_value("password", password)?;
                let _ = write!(
                    line,
                    " password={password},compression={}",
                    if *compression { "on" } else { "off" }
                );
            }
            Self::Hdata { path, keys } => {
                push_token(line, "path", path)?;
                push_opt_token(line, "keys", keys.as_deref())?;
            }
            Self::Info { name } => push_token(line, "name", name)?,
            Self::Infolist {
                name,
                pointer,
                arguments,
            } => {
                push_token(line, "name", name)?;
                if pointer.is_none() && arguments.is_some() {
                    // Arguments are positional after the pointer.
                    line.push_str(" 0");
                }
                push_opt_token(line, "pointer", pointer.as_deref())?;
                push_opt_text(line, "arguments", arguments.as_deref())?;
            }
            Self::Nicklist { buffer } => {
                push_opt_token(line, "buffer", buffer.as_deref())?;
            }
            Self::Input { buffer, data } => {
                push_token(line, "buffer", buffer)?;
                push_opt_text(line, "data", Some(data))?;
            }
            Self::Sync { buffers, options } | Self::Desync { buffers, options } => {
                if buffers.is_none() && options.is_some() {
                    line.push_str(" *");
                }
                push_opt_token(line, "buffers", buffers.as_deref())?;
                push_opt_token(line, "options", options.as_deref())?;
            }
            Self::Ping { arguments } => {
                push_opt_text(line, "arguments", arguments.as_deref())?;
            }
            Self::Test | Self::Quit => {}
        }
        Ok(())
    }
}

/// A command plus the identifier its reply should carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: Option<String>,
    pub command: Command,
}

impl Request {
    /// A request without an identifier.
    pub fn new(command: Command) -> Self {
        Self { id: None, command }
    }

    /// A request whose reply will carry `id`.
    pub fn with_id(id: impl Into<String>, command: Command) -> Self {
        Self {
            id: Some(id.into()),
            command,
        }
    }

    /// Encodes the request as one `\n`-terminated line.
    pub fn to_line(&self) -> Result<String, ProtocolError> {
        let mut line = String::new();
        if let Some(id) = &self.id {
            if id.is_empty() || id.contains([')', '(']) || has_space_or_newline(id) {
                return Err(invalid("id", id));
            }
            let _ = write!(line, "({id}) ");
        }
        line.push_str(self.command.name());
        self.command.write_args(&mut line)?;
        line.push('\n');
        Ok(line)
    }
}

impl From<Command> for Request {
    fn from(command: Command) -> Self {
        Self::new(command)
    }
}

// ---------------------------------------------------------------------------
// Argument validation
// ---------------------------------------------------------------------------

fn has_newline(s: &str) -> bool {
    s.contains(['\n', '\r'])
}

fn has_space_or_newline(s: &str) -> bool {
    s.contains([' ', '\t']) || has_newline(s)
}

fn invalid(what: &str, value: &str) -> ProtocolError {
    ProtocolError::InvalidCommand(format!("{what} {value:?}"))
}

/// A single space-free argument.
fn push_token(line: &mut String, what: &str, value: &str) -> Result<(), ProtocolError> {
    if value.is_empty() || has_space_or_newline(value) {
        return Err(invalid(what, value));
    }
    line.push(' ');
    line.push_str(value);
    Ok(())
}

fn push_opt_token(
    line: &mut String,
    what: &str,
    value: Option<&str>,
) -> Result<(), ProtocolError> {
    match value {
        Some(v) => push_token(line, what, v),
        None => Ok(()),
    }
}

/// Free text running to the end of the line.
fn push_opt_text(
    line: &mut String,
    what: &str,
    value: Option<&str>,
) -> Result<(), ProtocolError> {
    let Some(value) = value else {
        return Ok(());
    };
    if has_newline(value) {
        return Err(invalid(what, value));
    }
    line.push(' ');
    line.push_str(value);
    Ok(())
}

/// `init` option values are comma-separated, so commas can't appear in them.
fn option_value(what: &str, value: &str) -> Result<(), ProtocolError> {
    if value.contains(',') || has_newline(value) {
        return Err(invalid(what, value));
    }
    Ok(())
}
