use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{FrameError, Result};

/// Wire envelope sent by clients: `{"command": ..., "subcommand": ..., "args": [...]}`.
///
/// `args` stays untyped here; [`Command::parse`] is the single place that
/// turns an envelope into a typed command or a protocol error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientCommand {
    pub command: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subcommand: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
}

/// Wire envelope written by the daemon, one or many per command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl ServerResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: String::new(),
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// A fully validated client command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SendText {
        phone: String,
        body: String,
    },
    SendMedia {
        phone: String,
        path: String,
        caption: String,
    },
    Check {
        phone: String,
    },
    Get {
        phone: String,
        tail: i64,
        follow: bool,
    },
    Cancel,
}

impl Command {
    pub fn parse(raw: ClientCommand) -> Result<Self> {
        match raw.command.as_str() {
            "send" => match raw.subcommand.as_str() {
                "text" => Ok(Command::SendText {
                    phone: string_arg(&raw.args, 0, "send text")?,
                    body: string_arg(&raw.args, 1, "send text")?,
                }),
                "media" => Ok(Command::SendMedia {
                    phone: string_arg(&raw.args, 0, "send media")?,
                    path: string_arg(&raw.args, 1, "send media")?,
                    // caption is optional on the wire
                    caption: string_arg(&raw.args, 2, "send media").unwrap_or_default(),
                }),
                other => Err(FrameError::UnknownCommand(format!("send {other}"))),
            },
            "check" => Ok(Command::Check {
                phone: string_arg(&raw.args, 0, "check")?,
            }),
            "get" => Ok(Command::Get {
                phone: string_arg(&raw.args, 0, "get")?,
                tail: int_arg(&raw.args, 1, "get")?,
                follow: bool_arg(&raw.args, 2, "get")?,
            }),
            "cancel" => Ok(Command::Cancel),
            other => Err(FrameError::UnknownCommand(other.to_string())),
        }
    }

    /// Back to the wire shape, used by the client side.
    pub fn into_wire(self) -> ClientCommand {
        match self {
            Command::SendText { phone, body } => ClientCommand {
                command: "send".into(),
                subcommand: "text".into(),
                args: vec![json!(phone), json!(body)],
            },
            Command::SendMedia {
                phone,
                path,
                caption,
            } => ClientCommand {
                command: "send".into(),
                subcommand: "media".into(),
                args: vec![json!(phone), json!(path), json!(caption)],
            },
            Command::Check { phone } => ClientCommand {
                command: "check".into(),
                subcommand: String::new(),
                args: vec![json!(phone)],
            },
            Command::Get {
                phone,
                tail,
                follow,
            } => ClientCommand {
                command: "get".into(),
                subcommand: String::new(),
                args: vec![json!(phone), json!(tail), json!(follow)],
            },
            Command::Cancel => ClientCommand {
                command: "cancel".into(),
                subcommand: String::new(),
                args: Vec::new(),
            },
        }
    }
}

fn string_arg(args: &[Value], index: usize, command: &'static str) -> Result<String> {
    match args.get(index).and_then(Value::as_str) {
        Some(value) => Ok(value.to_string()),
        None => Err(FrameError::BadArgs {
            command,
            reason: format!("expected string at position {index}"),
        }),
    }
}

fn int_arg(args: &[Value], index: usize, command: &'static str) -> Result<i64> {
    match args.get(index).and_then(Value::as_i64) {
        Some(value) => Ok(value),
        None => Err(FrameError::BadArgs {
            command,
            reason: format!("expected integer at position {index}"),
        }),
    }
}

fn bool_arg(args: &[Value], index: usize, command: &'static str) -> Result<bool> {
    match args.get(index).and_then(Value::as_bool) {
        Some(value) => Ok(value),
        None => Err(FrameError::BadArgs {
            command,
            reason: format!("expected bool at position {index}"),
        }),
    }
}
