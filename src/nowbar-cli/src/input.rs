use nowbar_session::{Event, EventSender};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Reads button tokens line by line and forwards them as input events.
pub struct InputReader {
    task: JoinHandle<()>,
    stop: Option<oneshot::Sender<()>>,
}

impl InputReader {
    pub fn stdin(events: EventSender) -> Self {
        Self::spawn(tokio::io::stdin(), events)
    }

    pub fn spawn<R>(reader: R, events: EventSender) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (stop, mut stopped) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                let line = tokio::select! {
                    _ = &mut stopped => break,
                    line = lines.next_line() => line,
                };
                match line {
                    Ok(Some(line)) => {
                        let token = line.trim();
                        if token.is_empty() {
                            continue;
                        }
                        if events.send(Event::Input(token.to_string())).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("input closed");
                        break;
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to read input");
                        break;
                    }
                }
            }
        });
        Self {
            task,
            stop: Some(stop),
        }
    }

    /// Stops reading and waits for the reader task to finish.
    pub async fn close(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(err) = self.task.await {
            warn!(error = %err, "input reader task failed");
        }
    }
}
