use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use owo_colors::OwoColorize;
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use zap_core::{
    Command, DEFAULT_SOCKET_PATH, FrameError, ServerResponse, read_frame, write_frame,
};

#[derive(Parser)]
#[command(name = "zap", about = "Talk to the zapd daemon", version)]
struct Cli {
    /// Socket the daemon listens on
    #[arg(long, default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Send a message
    Send {
        #[command(subcommand)]
        what: SendCommand,
    },
    /// Ask whether a phone number is on WhatsApp
    Check { phone: String },
    /// Print a chat's history, optionally following it live
    Get {
        phone: String,
        /// How many messages of history to replay
        #[arg(long, default_value_t = 20)]
        tail: i64,
        /// Keep the connection open and print messages as they arrive
        #[arg(long)]
        follow: bool,
    },
}

#[derive(Subcommand)]
enum SendCommand {
    /// A plain text message
    Text { recipient: String, body: String },
    /// A file; the daemon picks the upload type from the extension
    Media {
        recipient: String,
        file: PathBuf,
        #[arg(long, default_value = "")]
        caption: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Send { what } => {
            let command = match what {
                SendCommand::Text { recipient, body } => Command::SendText {
                    phone: recipient,
                    body,
                },
                SendCommand::Media {
                    recipient,
                    file,
                    caption,
                } => Command::SendMedia {
                    phone: recipient,
                    path: file.display().to_string(),
                    caption,
                },
            };
            let response = roundtrip(&cli.socket, command).await?;
            if !response.success {
                eprintln!("{}", response.message.red());
                return Ok(ExitCode::FAILURE);
            }
            println!("{}", "📤 sent".green());
        }
        CliCommand::Check { phone } => {
            let response = roundtrip(&cli.socket, Command::Check { phone }).await?;
            if !response.success {
                eprintln!("{}", response.message.red());
                return Ok(ExitCode::FAILURE);
            }
            println!("{}", response.message);
        }
        CliCommand::Get {
            phone,
            tail,
            follow,
        } => {
            return stream_chat(&cli.socket, phone, tail, follow).await;
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn connect(socket: &PathBuf) -> Result<(BufReader<OwnedReadHalf>, OwnedWriteHalf)> {
    let stream = UnixStream::connect(socket)
        .await
        .wrap_err_with(|| format!("could not reach zapd at {}", socket.display()))?;
    let (read_half, write_half) = stream.into_split();
    Ok((BufReader::new(read_half), write_half))
}

async fn roundtrip(socket: &PathBuf, command: Command) -> Result<ServerResponse> {
    let (mut reader, mut writer) = connect(socket).await?;
    write_frame(&mut writer, &command.into_wire()).await?;
    let response = read_frame(&mut reader)
        .await
        .wrap_err("the daemon closed the connection without answering")?;
    Ok(response)
}

async fn stream_chat(socket: &PathBuf, phone: String, tail: i64, follow: bool) -> Result<ExitCode> {
    let (mut reader, mut writer) = connect(socket).await?;

    let get = Command::Get {
        phone,
        tail,
        follow,
    };
    write_frame(&mut writer, &get.into_wire()).await?;

    let ack: ServerResponse = read_frame(&mut reader)
        .await
        .wrap_err("the daemon closed the connection without answering")?;
    if !ack.success {
        return Err(eyre!("server refused: {}", ack.message));
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                // best effort; the daemon also tears down on our hangup
                let _ = write_frame(&mut writer, &Command::Cancel.into_wire()).await;
                break;
            }
            frame = read_frame::<_, ServerResponse>(&mut reader) => match frame {
                Ok(response) if response.success => print_frame(&response.message),
                Ok(response) => {
                    eprintln!("{}", response.message.red());
                    return Ok(ExitCode::FAILURE);
                }
                Err(FrameError::Closed) => break,
                Err(e) => return Err(eyre!("stream error: {e}")),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_frame(message: &str) {
    if message.starts_with("── ") {
        println!("{}", message.dimmed());
    } else {
        println!("{message}");
    }
}
