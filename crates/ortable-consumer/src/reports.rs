use bytes::BytesMut;

use futures_util::stream::{Stream, StreamExt};

use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

use tokio_util::sync::CancellationToken;

use tracing::{info, warn};

use ortable::report::Report;

use crate::error::Result;
use crate::request::Request;

/// A report received from a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPayload {
    /// Identifier of the device which sent the report.
    pub id: usize,
    /// The report.
    pub report: Report,
}

// Splits the first complete line off the buffer, newline included.
fn next_line(buffer: &mut BytesMut) -> Option<BytesMut> {
    let position = buffer.iter().position(|byte| *byte == b'\n')?;
    Some(buffer.split_to(position + 1))
}

pub(crate) struct ReportsRunner;

impl ReportsRunner {
    // Opens the report stream of a device and forwards each report to the
    // given sender until the token is cancelled, the stream ends or all
    // receivers are dropped.
    pub(crate) async fn run(
        request: &Request,
        id: usize,
        sender: Sender<ReportPayload>,
        cancellation_token: CancellationToken,
    ) -> Result<JoinHandle<()>> {
        let stream = request
            .retrieve_response(None)
            .await?
            .stream()?
            .open_stream()
            .await?;

        info!("Report receiver started for device with id `{id}`");

        Ok(tokio::spawn(Self::receive(
            stream,
            id,
            sender,
            cancellation_token,
        )))
    }

    async fn receive<S>(
        stream: S,
        id: usize,
        sender: Sender<ReportPayload>,
        cancellation_token: CancellationToken,
    ) where
        S: Stream<Item = Result<bytes::Bytes>>,
    {
        tokio::pin!(stream);
        let mut buffer = BytesMut::new();

        loop {
            tokio::select! {
                () = cancellation_token.cancelled() => {
                    info!("Report receiver for device with id `{id}` stopped");
                    break;
                }
                () = sender.closed() => {
                    info!("Report receiver for device with id `{id}` dropped");
                    break;
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(chunk)) => {
                        buffer.extend_from_slice(&chunk);
                        while let Some(line) = next_line(&mut buffer) {
                            if line.trim_ascii().is_empty() {
                                continue;
                            }

                            let report = match Report::from_line(&line) {
                                Ok(report) => report,
                                Err(e) => {
                                    warn!("Discarding malformed report from device with id `{id}`: {e}");
                                    continue;
                                }
                            };

                            // Cancellation also interrupts a send on a full channel.
                            tokio::select! {
                                () = cancellation_token.cancelled() => return,
                                sent = sender.send(ReportPayload { id, report }) => {
                                    if sent.is_err() {
                                        return;
                                    }
                                }
                            }
                        }
                    }
                    // The stream error has already been logged.
                    Some(Err(_)) => break,
                    None => {
                        info!("Report stream of device with id `{id}` closed");
                        break;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};

    use futures_util::stream;

    use tokio::sync::mpsc;

    use tokio_util::sync::CancellationToken;

    use ortable::controller::AxisController;
    use ortable::report::Report;

    use crate::error::Result;

    use super::{ReportsRunner, next_line};

    #[test]
    fn lines() {
        let mut buffer = BytesMut::from(&b"first\nsecond\nthi"[..]);

        assert_eq!(next_line(&mut buffer).as_deref(), Some(&b"first\n"[..]));
        assert_eq!(next_line(&mut buffer).as_deref(), Some(&b"second\n"[..]));
        assert_eq!(next_line(&mut buffer), None);

        buffer.extend_from_slice(b"rd\n");
        assert_eq!(next_line(&mut buffer).as_deref(), Some(&b"third\n"[..]));
        assert!(buffer.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reports_split_across_chunks() {
        let report = Report::Metrics(AxisController::new().snapshot());
        let line = report.to_line().unwrap();
        let (head, tail) = line.split_at(line.len() / 2);

        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::copy_from_slice(head)),
            Ok(Bytes::copy_from_slice(tail)),
            Ok(Bytes::from_static(b"\nnot a report\n")),
            Ok(Bytes::copy_from_slice(&line)),
        ];

        let (tx, mut rx) = mpsc::channel(4);
        ReportsRunner::receive(stream::iter(chunks), 3, tx, CancellationToken::new()).await;

        // Blank and malformed lines are skipped.
        let payload = rx.recv().await.unwrap();
        assert_eq!(payload.id, 3);
        assert_eq!(payload.report, report);
        assert_eq!(rx.recv().await.unwrap().report, report);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_receiver() {
        let token = CancellationToken::new();
        token.cancel();

        let (tx, mut rx) = mpsc::channel(1);
        ReportsRunner::receive(stream::pending::<Result<Bytes>>(), 0, tx, token).await;

        assert_eq!(rx.recv().await, None);
    }
}
