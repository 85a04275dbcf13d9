//! Bridges OS termination signals to a scheduler stop request.

use metronome_core::MetronomeError;
use metronome_scheduler::StopHandle;
use tokio::task::JoinHandle;

/// Listen for SIGTERM, SIGHUP and SIGINT and forward each to
/// [`StopHandle::hang_up`]. Abort the returned handle to uninstall.
#[cfg(unix)]
pub fn install(stop: StopHandle) -> Result<JoinHandle<()>, MetronomeError> {
    use tokio::signal::unix::{signal, SignalKind};

    let listen = |kind: SignalKind, name: &str| {
        signal(kind).map_err(|e| {
            MetronomeError::InstallationError(format!("Cannot install {name} handler: {e}"))
        })
    };
    let mut term = listen(SignalKind::terminate(), "SIGTERM")?;
    let mut hup = listen(SignalKind::hangup(), "SIGHUP")?;
    let mut int = listen(SignalKind::interrupt(), "SIGINT")?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = term.recv() => "SIGTERM",
                Some(()) = hup.recv() => "SIGHUP",
                Some(()) = int.recv() => "SIGINT",
                else => break,
            };
            stop.hang_up(name);
        }
    }))
}

#[cfg(not(unix))]
pub fn install(stop: StopHandle) -> Result<JoinHandle<()>, MetronomeError> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            stop.hang_up("Ctrl-C");
        }
    }))
}
