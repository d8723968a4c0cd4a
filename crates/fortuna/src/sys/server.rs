use crate::events::{AppEvent, ControlCommand};
use crate::sys::runtime::SharedGenerator;
use async_channel::Sender;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::oneshot;

pub const SOCKET_PATH: &str = "/tmp/fortuna.sock";

pub async fn run_server(tx: Sender<AppEvent>, generator: SharedGenerator) {
    if std::fs::metadata(SOCKET_PATH).is_ok() {
        let _ = std::fs::remove_file(SOCKET_PATH);
    }

    let listener = match UnixListener::bind(SOCKET_PATH) {
        Ok(l) => l,
        Err(e) => {
            log::error!("Failed to bind unix socket: {}", e);
            return;
        }
    };
    log::info!("Listening on {}", SOCKET_PATH);

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let tx = tx.clone();
                let generator = generator.clone();
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut lines = BufReader::new(read).lines();

                    while let Ok(Some(line)) = lines.next_line().await {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let reply = match line.parse::<ControlCommand>() {
                            Ok(command) => execute(command, &tx, &generator).await,
                            Err(e) => format!("error: {}", e),
                        };
                        let reply = format!("{}\n", reply.trim_end());
                        if let Err(e) = write.write_all(reply.as_bytes()).await {
                            log::warn!("Failed to reply to client: {}", e);
                            break;
                        }
                    }
                });
            }
            Err(e) => {
                log::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Runs one control command and renders the reply line(s).
pub async fn execute(
    command: ControlCommand,
    tx: &Sender<AppEvent>,
    generator: &SharedGenerator,
) -> String {
    log::debug!("Control command: {}", command);
    match command {
        ControlCommand::Spin(forced_slot) => {
            let (reply, response) = oneshot::channel();
            if tx.send(AppEvent::Spin { forced_slot, reply }).await.is_err() {
                return "error: wheel is shut down".to_string();
            }
            match response.await {
                Ok(Ok(outcome)) => format!(
                    "spin {} slot {} prize {} ({}) turns {} delta {:.2}",
                    outcome.id,
                    outcome.target_slot,
                    outcome.prize.label,
                    outcome.prize.value,
                    outcome.full_turns,
                    outcome.rotation_delta
                ),
                Ok(Err(e)) => format!("error: {}", e),
                Err(_) => "error: wheel dropped the request".to_string(),
            }
        }
        ControlCommand::Cancel => notify(tx, AppEvent::Cancel).await,
        ControlCommand::Stats => {
            let snapshot = generator.lock().statistics();
            snapshot.to_string()
        }
        ControlCommand::Reset(scope) => {
            generator.lock().reset_statistics(scope);
            format!("ok: reset {}", scope)
        }
        ControlCommand::Shutdown => notify(tx, AppEvent::Shutdown).await,
    }
}

async fn notify(tx: &Sender<AppEvent>, event: AppEvent) -> String {
    match tx.send(event).await {
        Ok(()) => "ok".to_string(),
        Err(_) => "error: wheel is shut down".to_string(),
    }
}
