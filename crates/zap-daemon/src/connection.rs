//! Per-connection state machine.
//!
//! A connection reads exactly one command, dispatches it, and answers with
//! one frame. The exception is `get`, which answers with an acknowledgment
//! frame, a history replay, and (with `follow`) a live stream that runs
//! until the client sends `cancel`, hangs up, or the daemon shuts down.
//!
//! Every frame written on a connection goes through one mpsc queue drained
//! by a single writer task that owns the write half, so the replay, the push
//! loop and error responses can never interleave bytes on the wire.

use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::net::unix::OwnedReadHalf;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use zap_core::{ClientCommand, Command, ServerResponse, read_frame, user_jid, write_frame};
use zap_db::MessageStore;
use zap_gateway::{Gateway, classify_media};

use crate::error::Result;
use crate::format;

const OUTBOUND_QUEUE_DEPTH: usize = 64;

type Reader = BufReader<OwnedReadHalf>;
type Outbound = mpsc::Sender<ServerResponse>;

/// Everything a connection handler needs, cloned per accepted connection.
#[derive(Clone)]
pub struct ConnectionCtx {
    pub store: Arc<MessageStore>,
    pub gateway: Arc<dyn Gateway>,
    pub ready: watch::Receiver<bool>,
    pub shutdown: CancellationToken,
}

pub async fn handle_connection(stream: UnixStream, ctx: ConnectionCtx) {
    if let Err(e) = run(stream, ctx).await {
        debug!("connection ended: {e}");
    }
}

async fn run(stream: UnixStream, ctx: ConnectionCtx) -> Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let (out_tx, mut out_rx) = mpsc::channel::<ServerResponse>(OUTBOUND_QUEUE_DEPTH);
    let writer = tokio::spawn(async move {
        let mut write_half = write_half;
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = write_frame(&mut write_half, &frame).await {
                debug!("dropping connection writer: {e}");
                break;
            }
        }
    });

    let outcome = dispatch(&mut reader, &out_tx, &ctx).await;

    // closing the queue lets the writer flush whatever is already enqueued
    drop(out_tx);
    let _ = writer.await;
    outcome
}

async fn dispatch(reader: &mut Reader, out_tx: &Outbound, ctx: &ConnectionCtx) -> Result<()> {
    let raw: ClientCommand = read_frame(reader).await?;
    let command = Command::parse(raw)?;

    // degraded mode answers immediately instead of queueing behind the gateway
    if !*ctx.ready.borrow() {
        let _ = out_tx
            .send(ServerResponse::fail("gateway still connecting"))
            .await;
        return Ok(());
    }

    match command {
        Command::SendText { phone, body } => {
            let response = match ctx.gateway.send_text(&user_jid(&phone), &body).await {
                Ok(()) => ServerResponse::ok(),
                Err(e) => ServerResponse::fail(format!("error sending text message: {e}")),
            };
            let _ = out_tx.send(response).await;
        }
        Command::SendMedia {
            phone,
            path,
            caption,
        } => {
            let response = match send_media(ctx, &phone, &path, &caption).await {
                Ok(()) => ServerResponse::ok(),
                Err(e) => ServerResponse::fail(format!("error sending media message: {e}")),
            };
            let _ = out_tx.send(response).await;
        }
        Command::Check { phone } => {
            let response = match check_contact(ctx, &user_jid(&phone)).await {
                Ok(exists) => ServerResponse::ok_with(exists.to_string()),
                Err(e) => ServerResponse::fail(format!("error checking contact: {e}")),
            };
            let _ = out_tx.send(response).await;
        }
        Command::Get {
            phone,
            tail,
            follow,
        } => return handle_get(reader, out_tx, ctx, &phone, tail, follow).await,
        // cancel outside a stream has nothing to tear down and gets no reply
        Command::Cancel => {}
    }

    Ok(())
}

async fn send_media(
    ctx: &ConnectionCtx,
    phone: &str,
    path: &str,
    caption: &str,
) -> std::result::Result<(), zap_gateway::GatewayError> {
    let path = std::path::Path::new(path);
    let (kind, mime) = classify_media(path);
    ctx.gateway
        .send_media(&user_jid(phone), kind, mime, path, caption)
        .await
}

/// The store only ever short-circuits a *positive* answer; a miss (or a
/// store hiccup) falls through to the service, which stays authoritative.
async fn check_contact(
    ctx: &ConnectionCtx,
    jid: &str,
) -> std::result::Result<bool, zap_gateway::GatewayError> {
    if matches!(ctx.store.contact_known(jid).await, Ok(true)) {
        return Ok(true);
    }
    ctx.gateway.contact_exists(jid).await
}

async fn handle_get(
    reader: &mut Reader,
    out_tx: &Outbound,
    ctx: &ConnectionCtx,
    phone: &str,
    tail: i64,
    follow: bool,
) -> Result<()> {
    let chat_jid = user_jid(phone);

    let _ = out_tx.send(ServerResponse::ok()).await;

    let history = match ctx.store.get_messages(&chat_jid, tail).await {
        Ok(history) => history,
        Err(e) => {
            // persistence failure stays scoped to this command; no stream
            let _ = out_tx
                .send(ServerResponse::fail(format!("error reading history: {e}")))
                .await;
            return Ok(());
        }
    };

    let mut last_day = None;
    for message in &history {
        let day = format::local_day(message.timestamp);
        if last_day != Some(day) {
            last_day = Some(day);
            let _ = out_tx
                .send(ServerResponse::ok_with(format::date_separator(day)))
                .await;
        }
        let _ = out_tx
            .send(ServerResponse::ok_with(format::format_message(message)))
            .await;
    }

    if !follow {
        return Ok(());
    }

    stream_live(reader, out_tx, ctx, &chat_jid, last_day).await;
    Ok(())
}

/// Streaming state: a push loop over the gateway subscription and a watcher
/// that keeps reading the connection for `cancel`. One session token tears
/// both down, whichever side stops first.
async fn stream_live(
    reader: &mut Reader,
    out_tx: &Outbound,
    ctx: &ConnectionCtx,
    chat_jid: &str,
    last_day: Option<chrono::NaiveDate>,
) {
    let session = ctx.shutdown.child_token();
    // subscribing only now keeps replay strictly ahead of any live frame
    let events = ctx.gateway.subscribe();

    let push = tokio::spawn(push_loop(
        events,
        out_tx.clone(),
        session.clone(),
        chat_jid.to_string(),
        last_day,
    ));

    loop {
        tokio::select! {
            _ = session.cancelled() => break,
            frame = read_frame::<_, ClientCommand>(reader) => {
                match frame {
                    Ok(raw) => match Command::parse(raw) {
                        // cancel needs no response, just the teardown
                        Ok(Command::Cancel) => break,
                        Ok(other) => debug!("ignoring mid-stream command: {other:?}"),
                        Err(e) => {
                            debug!("protocol error while streaming: {e}");
                            break;
                        }
                    },
                    Err(e) => {
                        debug!("client side went away: {e}");
                        break;
                    }
                }
            }
        }
    }

    session.cancel();
    let _ = push.await;
}

async fn push_loop(
    mut events: broadcast::Receiver<zap_core::MessageEvent>,
    out_tx: Outbound,
    session: CancellationToken,
    chat_jid: String,
    mut last_day: Option<chrono::NaiveDate>,
) {
    loop {
        tokio::select! {
            _ = session.cancelled() => break,
            received = events.recv() => match received {
                Ok(event) => {
                    if event.chat_jid != chat_jid {
                        continue;
                    }
                    let day = format::local_day(event.timestamp);
                    if last_day != Some(day) {
                        last_day = Some(day);
                        let separator = ServerResponse::ok_with(format::date_separator(day));
                        if out_tx.send(separator).await.is_err() {
                            break;
                        }
                    }
                    let frame = ServerResponse::ok_with(format::format_event(&event));
                    if out_tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("push loop lagged, {missed} live events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
