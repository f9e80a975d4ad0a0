//! Sink Writer: buffered byte fan-out to the console and file output channels.
//!
//! Owned exclusively by the output thread (§5). Byte-identical fan-out across
//! channels is the guarantee that matters here, not individual-channel success.

use std::io::{self, Write};

/// Fixed flush-buffer capacity (§3).
pub const FLUSH_BUFFER_CAPACITY: usize = 4096;

/// One output destination: a writer plus whether it is a console device.
///
/// The caller is responsible for enforcing the "exactly one channel is a
/// console" invariant (§3) — the Sink Writer itself is agnostic to how many
/// of its channels are consoles.
pub struct OutputChannel<W: Write> {
    writer: W,
    pub is_console: bool,
}

impl<W: Write> OutputChannel<W> {
    pub fn new(writer: W, is_console: bool) -> Self {
        Self { writer, is_console }
    }

    /// Write the full buffer from offset 0, looping on short writes until the
    /// channel returns zero bytes or an error. Never partially skips a flush:
    /// either the whole buffer lands, or the channel is abandoned for this
    /// flush (§4.1 error conditions), but the buffer itself is untouched so
    /// the next channel still sees it from byte 0.
    fn write_all_best_effort(&mut self, buf: &[u8]) {
        let mut offset = 0;
        while offset < buf.len() {
            match self.writer.write(&buf[offset..]) {
                Ok(0) => break,
                Ok(n) => offset += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    }
}

/// Buffered fan-out writer over up to two output channels (§4.1).
pub struct SinkWriter<W: Write> {
    channels: Vec<OutputChannel<W>>,
    buffer: Vec<u8>,
}

impl<W: Write> SinkWriter<W> {
    pub fn new(channels: Vec<OutputChannel<W>>) -> Self {
        Self {
            channels,
            buffer: Vec::with_capacity(FLUSH_BUFFER_CAPACITY),
        }
    }

    pub fn channels(&self) -> &[OutputChannel<W>] {
        &self.channels
    }

    /// Append bytes into the flush buffer, flushing synchronously whenever it
    /// fills, and chunking payloads that exceed remaining capacity.
    pub fn write(&mut self, mut bytes: &[u8]) -> io::Result<()> {
        while !bytes.is_empty() {
            let remaining = FLUSH_BUFFER_CAPACITY - self.buffer.len();
            let take = remaining.min(bytes.len());
            self.buffer.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];

            if self.buffer.len() == FLUSH_BUFFER_CAPACITY {
                self.flush()?;
            }
        }
        Ok(())
    }

    /// Write the full buffer to every channel in order, tolerating per-channel
    /// failures, then reset the buffer length to 0.
    pub fn flush(&mut self) -> io::Result<()> {
        for channel in &mut self.channels {
            channel.write_all_best_effort(&self.buffer);
            let _ = channel.writer.flush();
        }
        self.buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct RecordingWriter {
        data: Arc<Mutex<Vec<u8>>>,
    }

    impl RecordingWriter {
        fn new() -> Self {
            Self {
                data: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn snapshot(&self) -> Vec<u8> {
            self.data.lock().unwrap().clone()
        }
    }

    impl Write for RecordingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.data.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingWriter {
        attempts: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            Err(io::Error::new(io::ErrorKind::Other, "write failed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn identical_fan_out_to_both_channels() {
        let a = RecordingWriter::new();
        let b = RecordingWriter::new();
        let mut sink = SinkWriter::new(vec![
            OutputChannel::new(a.clone(), true),
            OutputChannel::new(b.clone(), false),
        ]);

        sink.write(b"hello\n").unwrap();
        sink.flush().unwrap();

        assert_eq!(a.snapshot(), b"hello\n");
        assert_eq!(b.snapshot(), b"hello\n");
    }

    #[test]
    fn buffer_flushes_automatically_when_full() {
        let a = RecordingWriter::new();
        let mut sink = SinkWriter::new(vec![OutputChannel::new(a.clone(), false)]);

        let payload = vec![b'x'; FLUSH_BUFFER_CAPACITY + 100];
        sink.write(&payload).unwrap();
        sink.flush().unwrap();

        assert_eq!(a.snapshot().len(), payload.len());
        assert_eq!(a.snapshot(), payload);
    }

    #[test]
    fn one_channel_failing_does_not_block_the_other() {
        let good = RecordingWriter::new();
        let mut sink = SinkWriter::new(vec![
            OutputChannel::new(FailingWriter { attempts: 0 }, false),
            OutputChannel::new(good.clone(), true),
        ]);

        sink.write(b"still delivered").unwrap();
        sink.flush().unwrap();

        assert_eq!(good.snapshot(), b"still delivered");
    }

    #[test]
    fn buffer_resets_to_empty_after_flush() {
        let a = RecordingWriter::new();
        let mut sink = SinkWriter::new(vec![OutputChannel::new(a, false)]);
        sink.write(b"abc").unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.buffer.len(), 0);
    }
}
