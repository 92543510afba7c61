// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Message channel over a connected RFCOMM stream.

use std::io::ErrorKind;
use tokio::io::{
    AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::framing::MessageBuffer;
use crate::error::ChannelError;

/// Why a channel stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the stream.
    RemoteDisconnected,
    /// We closed the channel while a read was outstanding.
    LocallyAborted,
    /// The read failed.
    Failed(String),
}

/// Events emitted by the read loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// One complete message, without its terminator.
    Message(String),
    /// The read loop ended. Always the last event.
    Closed(CloseReason),
}

/// State of a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closed(CloseReason),
}

/// A framed, bidirectional text channel.
///
/// Reading happens in a background task that reports [`ChannelEvent`]s in
/// stream order; writing happens on the caller's task through [`send`].
///
/// [`send`]: MessageChannel::send
pub struct MessageChannel<S> {
    writer: Option<WriteHalf<S>>,
    events_rx: mpsc::Receiver<ChannelEvent>,
    abort_tx: Option<oneshot::Sender<()>>,
    reader: Option<JoinHandle<CloseReason>>,
    state: ChannelState,
}

impl<S> MessageChannel<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wrap a connected stream and start the read loop.
    pub fn open(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        let (events_tx, events_rx) = mpsc::channel(32);
        let (abort_tx, abort_rx) = oneshot::channel();

        let reader = tokio::spawn(read_loop(reader, events_tx, abort_rx));

        Self {
            writer: Some(writer),
            events_rx,
            abort_tx: Some(abort_tx),
            reader: Some(reader),
            state: ChannelState::Open,
        }
    }

    /// Current state.
    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    /// Wait for the next event from the read loop.
    ///
    /// Returns `None` after the terminal event has been delivered. Cancel safe.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        let event = self.events_rx.recv().await?;
        if let ChannelEvent::Closed(reason) = &event {
            self.state = ChannelState::Closed(reason.clone());
            self.writer = None;
        }
        Some(event)
    }

    /// Write `text` as-is and flush. No terminator is appended.
    pub async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        let writer = match (&self.state, self.writer.as_mut()) {
            (ChannelState::Open, Some(writer)) => writer,
            _ => return Err(ChannelError::Closed),
        };

        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
        debug!("Sent {} bytes", text.len());
        Ok(())
    }

    /// Stop the read loop and release the stream.
    ///
    /// Returns how the channel ended. Safe to call more than once.
    pub async fn close(&mut self) -> CloseReason {
        if let Some(abort_tx) = self.abort_tx.take() {
            let _ = abort_tx.send(());
        }
        // Unblocks a reader waiting for room in the event queue.
        self.events_rx.close();

        let reason = match self.reader.take() {
            Some(reader) => match reader.await {
                Ok(reason) => reason,
                Err(e) => {
                    warn!("Read loop failed: {}", e);
                    CloseReason::Failed(e.to_string())
                }
            },
            None => match &self.state {
                ChannelState::Closed(reason) => reason.clone(),
                ChannelState::Open => CloseReason::LocallyAborted,
            },
        };

        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("Shutdown of write half failed: {}", e);
            }
        }

        if self.state == ChannelState::Open {
            self.state = ChannelState::Closed(reason.clone());
        }
        reason
    }
}

impl<S> std::fmt::Debug for MessageChannel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageChannel")
            .field("state", &self.state)
            .finish()
    }
}

/// Byte-at-a-time framing loop.
async fn read_loop<S>(
    reader: ReadHalf<S>,
    events_tx: mpsc::Sender<ChannelEvent>,
    mut abort_rx: oneshot::Receiver<()>,
) -> CloseReason
where
    S: AsyncRead,
{
    let mut reader = BufReader::new(reader);
    let mut buffer = MessageBuffer::new();

    let reason = loop {
        let read = tokio::select! {
            biased;
            _ = &mut abort_rx => break CloseReason::LocallyAborted,
            read = reader.read_u8() => read,
        };

        match read {
            Ok(byte) => {
                if let Some(message) = buffer.push(byte) {
                    debug!("Received message: {} bytes", message.len());
                    if events_tx.send(ChannelEvent::Message(message)).await.is_err() {
                        break CloseReason::LocallyAborted;
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                info!("Connection closed by remote");
                break CloseReason::RemoteDisconnected;
            }
            Err(e) if e.kind() == ErrorKind::ConnectionAborted => {
                // The socket was torn down underneath us.
                break CloseReason::LocallyAborted;
            }
            Err(e) => {
                warn!("Read error: {}", e);
                break CloseReason::Failed(e.to_string());
            }
        }
    };

    if !buffer.is_empty() {
        debug!("Discarding {} bytes of partial message", buffer.len());
    }

    if reason != CloseReason::LocallyAborted {
        let _ = events_tx.send(ChannelEvent::Closed(reason.clone())).await;
    }
    reason
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::duplex;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    /// Stream whose reads always fail.
    struct BrokenLink;

    impl AsyncRead for BrokenLink {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::new(ErrorKind::Other, "link reset")))
        }
    }

    impl AsyncWrite for BrokenLink {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    async fn next<S>(channel: &mut MessageChannel<S>) -> ChannelEvent
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        timeout(WAIT, channel.next_event())
            .await
            .expect("timed out waiting for channel event")
            .expect("channel event stream ended")
    }

    #[tokio::test]
    async fn test_two_messages_in_order() {
        let (mut remote, local) = duplex(64);
        let mut channel = MessageChannel::open(local);

        remote.write_all(b"hello\nworld\n").await.unwrap();

        assert_eq!(next(&mut channel).await, ChannelEvent::Message("hello".into()));
        assert_eq!(next(&mut channel).await, ChannelEvent::Message("world".into()));
        assert!(channel.is_open());
    }

    #[tokio::test]
    async fn test_partial_message_then_remote_close() {
        let (mut remote, local) = duplex(64);
        let mut channel = MessageChannel::open(local);

        remote.write_all(b"abc").await.unwrap();
        drop(remote);

        assert_eq!(
            next(&mut channel).await,
            ChannelEvent::Closed(CloseReason::RemoteDisconnected)
        );
        assert_eq!(
            channel.state(),
            &ChannelState::Closed(CloseReason::RemoteDisconnected)
        );
        assert!(channel.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_send_writes_text_unchanged() {
        let (mut remote, local) = duplex(64);
        let mut channel = MessageChannel::open(local);

        channel.send("no newline").await.unwrap();
        channel.send(" then one\n").await.unwrap();

        let mut received = vec![0u8; 20];
        remote.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"no newline then one\n");
    }

    #[tokio::test]
    async fn test_close_aborts_pending_read() {
        let (mut remote, local) = duplex(64);
        let mut channel = MessageChannel::open(local);

        let reason = timeout(WAIT, channel.close()).await.unwrap();
        assert_eq!(reason, CloseReason::LocallyAborted);
        assert!(!channel.is_open());

        // Abort is not reported as an event.
        assert!(channel.next_event().await.is_none());

        // The peer sees end of stream.
        let mut buf = [0u8; 1];
        assert_eq!(remote.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_close_twice() {
        let (_remote, local) = duplex(64);
        let mut channel = MessageChannel::open(local);

        assert_eq!(channel.close().await, CloseReason::LocallyAborted);
        assert_eq!(channel.close().await, CloseReason::LocallyAborted);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (_remote, local) = duplex(64);
        let mut channel = MessageChannel::open(local);
        channel.close().await;

        assert!(matches!(
            channel.send("late\n").await,
            Err(ChannelError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_send_after_remote_close_fails() {
        let (remote, local) = duplex(64);
        let mut channel = MessageChannel::open(local);
        drop(remote);

        assert_eq!(
            next(&mut channel).await,
            ChannelEvent::Closed(CloseReason::RemoteDisconnected)
        );
        assert!(matches!(channel.send("x").await, Err(ChannelError::Closed)));
    }

    #[tokio::test]
    async fn test_read_error_closes_as_failed() {
        let mut channel = MessageChannel::open(BrokenLink);

        match next(&mut channel).await {
            ChannelEvent::Closed(CloseReason::Failed(reason)) => {
                assert!(reason.contains("link reset"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            channel.state(),
            ChannelState::Closed(CloseReason::Failed(_))
        ));
        assert!(matches!(channel.send("x").await, Err(ChannelError::Closed)));
    }
}
