use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::config::Limits;
use crate::connection::ConnectionState;
use crate::error::{Error, Result};
use crate::message::{CloseCode, CloseFrame, Message};
use crate::protocol::{AssembledMessage, Frame, MessageAssembler, OpCode, StreamReassembler};

/// Transport read size per call.
const READ_CHUNK: usize = 4096;

/// One established WebSocket connection over an async byte stream.
///
/// Owns the per-connection stream reassembler and message assembler; both
/// live exactly as long as the connection and are never shared. `recv`
/// drives the dispatch loop (bytes -> frames -> events) and `send` builds a
/// single unfragmented outbound frame — outbound fragmentation is a
/// deliberate non-feature.
///
/// Default control handling: a ping is answered with a pong echoing the same
/// payload before the ping event is surfaced; the first close frame is
/// echoed and the transport treated as closed, a second close after a
/// self-initiated close is not re-echoed.
pub struct Connection<T> {
    io: T,
    reassembler: StreamReassembler,
    assembler: MessageAssembler,
    state: ConnectionState,
    limits: Limits,
    // Outbound bytes not yet accepted by the transport. Progress is
    // recorded after every partial write, so a future dropped mid-frame
    // leaves the remainder here and the next write completes it before
    // emitting anything new.
    write_buf: Vec<u8>,
    write_pos: usize,
}

impl<T> Connection<T> {
    /// Wrap a transport whose upgrade handshake already succeeded.
    pub fn new(io: T, limits: Limits) -> Self {
        Self {
            io,
            reassembler: StreamReassembler::new(limits.max_frame_size),
            assembler: MessageAssembler::new(limits.clone()),
            state: ConnectionState::Open,
            limits,
            write_buf: Vec::with_capacity(1024),
            write_pos: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether messages can still be sent.
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Consume the connection, returning the transport.
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Connection<T> {
    /// Receive the next logical event.
    ///
    /// Drains buffered frames first and reads from the transport only when
    /// the reassembler runs dry, so arbitrarily chunked delivery (many
    /// frames per read, or one frame across many reads) behaves
    /// identically. Returns `Ok(None)` once the connection is closed.
    ///
    /// Safe to race in `select!`: the pong and close echoes written here
    /// survive cancellation. A frame interrupted mid-write is finished by
    /// the next `recv` or `send` before any later frame, so dropping the
    /// future cannot interleave bytes on the wire.
    ///
    /// # Errors
    ///
    /// A protocol violation stops reassembly permanently; a best-effort
    /// close frame is sent before the error is returned. I/O errors
    /// propagate as `Error::Io`.
    pub async fn recv(&mut self) -> Result<Option<Message>> {
        loop {
            if !self.state.can_receive() {
                return Ok(None);
            }

            // Finish any frame whose write a cancelled future left behind.
            self.flush_pending().await?;

            let frame = match self.reassembler.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    let mut chunk = [0u8; READ_CHUNK];
                    let n = self.io.read(&mut chunk).await?;
                    if n == 0 {
                        // Abrupt disconnect; no close handshake happened.
                        self.state = ConnectionState::Closed;
                        return Ok(None);
                    }
                    self.reassembler.feed(&chunk[..n]);
                    continue;
                }
                Err(err) => {
                    self.fail(&err).await;
                    return Err(err);
                }
            };

            match frame.opcode {
                OpCode::Ping => {
                    let pong = Frame::pong(frame.payload.clone());
                    self.write_frame(&pong).await?;
                    return Ok(Some(Message::Ping(frame.payload)));
                }
                OpCode::Pong => return Ok(Some(Message::Pong(frame.payload))),
                OpCode::Close => return self.handle_close(frame).await.map(Some),
                OpCode::Text | OpCode::Binary | OpCode::Continuation => {
                    match self.assembler.push(frame) {
                        Ok(Some(assembled)) => {
                            return Ok(Some(Self::assembled_to_message(assembled)));
                        }
                        Ok(None) => {}
                        Err(err) => {
                            self.fail(&err).await;
                            return Err(err);
                        }
                    }
                }
            }
        }
    }

    /// Send a data or control message as one `fin=true` frame.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` if the connection no longer accepts
    ///   sends
    /// - `Error::MessageTooLarge` if a data payload exceeds the configured
    ///   maximum
    /// - `Error::ControlFrameTooLarge` if a control payload exceeds 125
    ///   bytes
    /// - `Error::Io` on transport failure
    pub async fn send(&mut self, message: Message) -> Result<()> {
        if !self.state.can_send() {
            return Err(Error::ConnectionClosed);
        }

        let frame = Frame::from(message);
        // Outbound frames obey the same control-frame rules as inbound ones.
        frame.validate()?;
        if frame.opcode.is_data() && frame.payload.len() > self.limits.max_message_size {
            return Err(Error::MessageTooLarge {
                size: frame.payload.len(),
                max: self.limits.max_message_size,
            });
        }

        if frame.opcode == OpCode::Close {
            self.state = ConnectionState::Closing;
        }
        self.write_frame(&frame).await
    }

    /// Initiate the close handshake with a code and reason.
    ///
    /// The peer's close echo is observed through a later `recv`. Calling
    /// this more than once is harmless.
    ///
    /// # Errors
    ///
    /// Returns `Error::ControlFrameTooLarge` when the code plus reason
    /// exceed the 125-byte control payload limit; the connection stays open.
    pub async fn close(&mut self, code: CloseCode, reason: &str) -> Result<()> {
        if self.state != ConnectionState::Open {
            return Ok(());
        }
        let frame = Frame::close(Some(code.as_u16()), reason);
        frame.validate()?;
        self.state = ConnectionState::Closing;
        debug!(code = code.as_u16(), reason, "initiating close handshake");
        self.write_frame(&frame).await
    }

    /// Close frame received from the peer. Echo it exactly once: if we are
    /// still open this completes the peer-initiated handshake; if we are
    /// already closing, this is the peer's echo of our own close and must
    /// not be answered again.
    async fn handle_close(&mut self, frame: Frame) -> Result<Message> {
        let body = Self::parse_close_body(&frame);

        if self.state == ConnectionState::Open {
            self.state = ConnectionState::Closing;
            let echo = Frame::new(true, OpCode::Close, frame.payload);
            // Teardown proceeds even when the echo cannot be written.
            let _ = self.write_frame(&echo).await;
        }
        self.state = ConnectionState::Closed;
        debug!(?body, "close handshake complete");
        Ok(Message::Close(body))
    }

    /// Best-effort close frame before tearing down over a fatal error. The
    /// peer gets the RFC code for the violation; write failures are ignored
    /// because the transport is going away regardless.
    async fn fail(&mut self, err: &Error) {
        warn!(error = %err, "terminating connection");
        if self.state.can_send() {
            let frame = Frame::close(Some(err.close_code()), "");
            let _ = self.write_frame(&frame).await;
        }
        self.state = ConnectionState::Closed;
    }

    async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        // Server frames are never masked. Appending behind any pending
        // bytes keeps frame boundaries intact even when an earlier write
        // was cut short by cancellation.
        frame.encode_into(&mut self.write_buf, None);
        self.flush_pending().await
    }

    /// Push buffered outbound bytes to the transport, recording progress
    /// after every partial write so cancellation between writes loses
    /// nothing.
    async fn flush_pending(&mut self) -> Result<()> {
        if self.write_pos >= self.write_buf.len() {
            return Ok(());
        }
        while self.write_pos < self.write_buf.len() {
            let n = self.io.write(&self.write_buf[self.write_pos..]).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            self.write_pos += n;
        }
        self.write_buf.clear();
        self.write_pos = 0;
        self.io.flush().await?;
        Ok(())
    }

    fn assembled_to_message(assembled: AssembledMessage) -> Message {
        match assembled.opcode {
            // UTF-8 was validated when the message completed.
            OpCode::Text => match String::from_utf8(assembled.payload) {
                Ok(text) => Message::Text(text),
                Err(err) => Message::Binary(err.into_bytes()),
            },
            _ => Message::Binary(assembled.payload),
        }
    }

    fn parse_close_body(frame: &Frame) -> Option<CloseFrame> {
        let payload = &frame.payload;
        if payload.len() >= 2 {
            let code = u16::from_be_bytes([payload[0], payload[1]]);
            let reason = std::str::from_utf8(&payload[2..]).unwrap_or_default();
            Some(CloseFrame::new(CloseCode::from_u16(code), reason))
        } else {
            None
        }
    }
}
