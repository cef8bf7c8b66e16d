//! Quiescence-window debouncer for free-text input.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Emits the most recent pushed value once no newer value arrived for `window`.
///
/// A settled value equal to the previously emitted one is swallowed, so typing
/// and then erasing back to the same text costs no request.
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    pub fn new(window: Duration) -> (Self, mpsc::UnboundedReceiver<T>) {
        Self::spawn(window, None)
    }

    /// Like [`Debouncer::new`], treating `initial` as already emitted.
    pub fn seeded(window: Duration, initial: T) -> (Self, mpsc::UnboundedReceiver<T>) {
        Self::spawn(window, Some(initial))
    }

    fn spawn(window: Duration, last_emitted: Option<T>) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (input, input_rx) = mpsc::unbounded_channel();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(window, last_emitted, input_rx, settled_tx));
        (Self { input, task }, settled_rx)
    }

    /// Restarts the window with `value` as the pending candidate.
    pub fn push(&self, value: T) {
        if self.input.send(value).is_err() {
            log::debug!("debouncer: push after shutdown ignored");
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<T>(
    window: Duration,
    mut last_emitted: Option<T>,
    mut input: mpsc::UnboundedReceiver<T>,
    settled: mpsc::UnboundedSender<T>,
) where
    T: Clone + PartialEq + Send + 'static,
{
    let mut pending: Option<T> = None;
    loop {
        let Some(candidate) = pending.take() else {
            match input.recv().await {
                Some(value) => pending = Some(value),
                None => break,
            }
            continue;
        };

        tokio::select! {
            received = input.recv() => match received {
                Some(value) => pending = Some(value),
                None => break,
            },
            _ = sleep(window) => {
                if last_emitted.as_ref() == Some(&candidate) {
                    continue;
                }
                if settled.send(candidate.clone()).is_err() {
                    break;
                }
                last_emitted = Some(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    const WINDOW: Duration = Duration::from_millis(300);

    #[tokio::test(start_paused = true)]
    async fn rapid_pushes_collapse_into_last_value() {
        let (debouncer, mut settled) = Debouncer::new(WINDOW);
        debouncer.push("l".to_string());
        sleep(Duration::from_millis(100)).await;
        debouncer.push("lo".to_string());
        sleep(Duration::from_millis(100)).await;
        let last_keystroke = Instant::now();
        debouncer.push("log".to_string());

        assert_eq!(settled.recv().await.as_deref(), Some("log"));
        assert!(last_keystroke.elapsed() >= WINDOW);

        sleep(Duration::from_secs(2)).await;
        assert!(settled.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_pushes_emit_each_value() {
        let (debouncer, mut settled) = Debouncer::new(WINDOW);
        debouncer.push("crash".to_string());
        sleep(Duration::from_millis(400)).await;
        debouncer.push("login".to_string());
        sleep(Duration::from_millis(400)).await;

        assert_eq!(settled.try_recv().ok().as_deref(), Some("crash"));
        assert_eq!(settled.try_recv().ok().as_deref(), Some("login"));
    }

    #[tokio::test(start_paused = true)]
    async fn returning_to_emitted_value_is_swallowed() {
        let (debouncer, mut settled) = Debouncer::seeded(WINDOW, String::new());
        debouncer.push("x".to_string());
        debouncer.push(String::new());
        sleep(Duration::from_millis(400)).await;
        assert!(settled.try_recv().is_err());

        debouncer.push("bug".to_string());
        sleep(Duration::from_millis(400)).await;
        debouncer.push("bugs".to_string());
        debouncer.push("bug".to_string());
        sleep(Duration::from_millis(400)).await;

        assert_eq!(settled.try_recv().ok().as_deref(), Some("bug"));
        assert!(settled.try_recv().is_err());
    }
}
