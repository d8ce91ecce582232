use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

/// Cooperative stop request shared between one listener and one acquisition loop.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// Background thread that watches operator input and raises a [`StopSignal`].
pub struct StopListener {
    handle: JoinHandle<()>,
}

impl StopListener {
    /// Listens on stdin. Typing `q`, `quit` or `stop`, or pressing Esc,
    /// followed by Enter requests the stop.
    pub fn spawn_stdin(signal: StopSignal) -> io::Result<Self> {
        Self::spawn(BufReader::new(io::stdin()), signal)
    }

    pub fn spawn<R>(input: R, signal: StopSignal) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("stop-listener".to_string())
            .spawn(move || listen(input, &signal))?;
        Ok(Self { handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the listener thread if it has already seen its stop command.
    ///
    /// A listener still blocked on input (the stop came from elsewhere) is
    /// detached instead, since nothing would ever wake it. Returns whether the
    /// thread was joined.
    pub fn join(self) -> bool {
        if !self.handle.is_finished() {
            debug!("Stop listener still waiting for input; detaching");
            return false;
        }
        if self.handle.join().is_err() {
            warn!("Stop listener thread panicked");
        }
        true
    }
}

fn listen<R: BufRead>(input: R, signal: &StopSignal) {
    for line in input.lines() {
        match line {
            Ok(line) if is_stop_command(&line) => {
                info!("Stop requested by operator");
                signal.request_stop();
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Stop listener failed to read input: {}", e);
                return;
            }
        }
    }
    debug!("Input closed; stop listener exiting");
}

pub fn is_stop_command(line: &str) -> bool {
    const ESC: char = '\u{1b}';
    line.contains(ESC)
        || matches!(
            line.trim().to_ascii_lowercase().as_str(),
            "q" | "quit" | "stop"
        )
}
