//! Shutdown triggers and run-once bookkeeping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const SIGINT: i32 = 2;
#[cfg(unix)]
const SIGQUIT: i32 = 3;
#[cfg(unix)]
const SIGTERM: i32 = 15;

/// Status of a process that dies from an unwinding panic
const PANIC_EXIT_CODE: i32 = 101;
/// How long a panicking main thread waits for reconciliation
const PANIC_WAIT: Duration = Duration::from_secs(5);

/// Sent by the panic hook; the panicking thread blocks until it is acknowledged
pub(crate) type PanicAck = std_mpsc::Sender<()>;

/// What started the shutdown sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// A termination signal, by number
    Signal(i32),
    /// A panic unwinding out of the main thread
    Panic,
    /// An explicit `shutdown()` call
    Explicit,
}

impl ShutdownTrigger {
    /// Exit status matching the default disposition of the signal
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Signal(signo) => Some(128 + signo),
            Self::Panic => Some(PANIC_EXIT_CODE),
            Self::Explicit => None,
        }
    }
}

/// Installed / started / completed flags for one adapter
#[derive(Debug)]
pub(crate) struct ShutdownState {
    installed: AtomicBool,
    started: AtomicBool,
    done: watch::Sender<bool>,
}

impl ShutdownState {
    pub(crate) fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            installed: AtomicBool::new(false),
            started: AtomicBool::new(false),
            done,
        }
    }

    /// True for the first caller only
    pub(crate) fn mark_installed(&self) -> bool {
        !self.installed.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    /// True for the first caller only
    pub(crate) fn begin(&self) -> bool {
        !self.started.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn finish(&self) {
        self.done.send_replace(true);
    }

    pub(crate) fn is_complete(&self) -> bool {
        *self.done.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<bool> {
        self.done.subscribe()
    }

    /// Resolve once the shutdown sequence has finished
    pub(crate) async fn wait(&self) {
        let mut done = self.subscribe();
        let _ = done.wait_for(|complete| *complete).await;
    }
}

/// Whether a panic on this thread takes the process down.
///
/// Panics in spawned tasks and worker threads are caught by their join
/// handles and the process keeps running.
fn is_terminal_panic(thread_name: Option<&str>) -> bool {
    thread_name == Some("main")
}

/// Put a hook after the current panic hook that reports main-thread panics on
/// a channel and holds the thread until the report is handled
pub(crate) fn chain_panic_hook() -> mpsc::UnboundedReceiver<PanicAck> {
    let (tx, rx) = mpsc::unbounded_channel();
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        previous(info);
        if !is_terminal_panic(std::thread::current().name()) {
            return;
        }
        let (ack, acked) = std_mpsc::channel();
        if tx.send(ack).is_ok() {
            let _ = acked.recv_timeout(PANIC_WAIT);
        }
    }));
    rx
}

/// Wait for a termination signal or a reported panic
pub(crate) async fn wait_for_trigger(
    panics: &mut mpsc::UnboundedReceiver<PanicAck>,
) -> (ShutdownTrigger, Option<PanicAck>) {
    tokio::select! {
        signo = wait_for_signal() => {
            tracing::info!(signal = signo, "Received termination signal");
            (ShutdownTrigger::Signal(signo), None)
        }
        Some(ack) = panics.recv() => {
            tracing::error!("Main thread panicked, reconciling before exit");
            (ShutdownTrigger::Panic, Some(ack))
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> i32 {
    use tokio::signal::unix::{signal, SignalKind};

    let streams = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::quit()),
    );
    let (mut interrupt, mut terminate, mut quit) = match streams {
        (Ok(i), Ok(t), Ok(q)) => (i, t, q),
        (i, t, q) => {
            let err = [i.err(), t.err(), q.err()].into_iter().flatten().next();
            tracing::error!(error = ?err, "Failed to install signal handlers");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = interrupt.recv() => SIGINT,
        _ = terminate.recv() => SIGTERM,
        _ = quit.recv() => SIGQUIT,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> i32 {
    match tokio::signal::ctrl_c().await {
        Ok(()) => SIGINT,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending().await
        }
    }
}
