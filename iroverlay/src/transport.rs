/*!
Non-blocking byte transport abstraction.

The sensor delivers a continuous byte stream; the pipeline's contract with
the transport is "give me whatever bytes are available right now". A read
never blocks and may return anything from zero bytes up to the requested
amount, which is why a tick that finds no frame is a normal outcome.
*/

use std::io;
use std::net::UdpSocket;
use std::path::Path;

use bytes::{Buf, BytesMut};
use tracing::{debug, info};

use shared::protocol::{FRAME_LENGTH_BYTES, GRID_SIZE, PAYLOAD_OFFSET, SIGNATURE};

/// Buffered sensor backlog cap, in frames.
///
/// The reader consumes at most one frame per tick; a sensor running ahead
/// of the tick rate would otherwise grow the buffer without bound and the
/// displayed thermal layer would lag ever further behind real time.
const PENDING_CAP_FRAMES: usize = 4;

/// A non-blocking source of sensor bytes
pub trait ByteSource {
    /// Copy up to `buf.len()` bytes that are available right now.
    ///
    /// Never blocks. Returns the number of bytes written, possibly zero.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Sensor byte stream delivered as UDP datagrams.
///
/// Datagram payloads are appended to an internal buffer in arrival order so
/// the reader sees one continuous byte stream.
pub struct UdpByteSource {
    socket: UdpSocket,
    pending: BytesMut,
    recv_buf: Vec<u8>,
}

impl UdpByteSource {
    /// Bind the sensor socket. Failure here is fatal to startup.
    pub fn bind(bind_addr: &str, port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind((bind_addr, port))?;
        socket.set_nonblocking(true)?;
        info!("listening for sensor data on {}:{}", bind_addr, port);

        Ok(Self {
            socket,
            pending: BytesMut::new(),
            recv_buf: vec![0u8; 65536],
        })
    }

    /// Pull every datagram currently queued on the socket into the buffer
    fn drain_socket(&mut self) -> io::Result<()> {
        loop {
            match self.socket.recv(&mut self.recv_buf) {
                Ok(n) => {
                    debug!("received {} sensor bytes", n);
                    push_capped(&mut self.pending, &self.recv_buf[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Append sensor bytes, keeping only the newest few frames of backlog.
///
/// When the cap is exceeded the oldest bytes are dropped, so the next
/// synchronization attempt sees the freshest sensor data instead of an
/// ever-older replay of the backlog.
fn push_capped(pending: &mut BytesMut, data: &[u8]) {
    pending.extend_from_slice(data);

    let cap = PENDING_CAP_FRAMES * FRAME_LENGTH_BYTES;
    if pending.len() > cap {
        let excess = pending.len() - cap;
        pending.advance(excess);
        debug!("sensor backlog over {} bytes, dropped {} oldest", cap, excess);
    }
}

impl ByteSource for UdpByteSource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.drain_socket()?;

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

/// Serves bytes from a recorded sensor capture.
///
/// At most `chunk` bytes are handed out per read to approximate the pacing
/// of a live transport; once the recording is exhausted every read returns
/// zero bytes.
pub struct ReplaySource {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ReplaySource {
    /// Load a recorded capture from disk
    pub fn open<P: AsRef<Path>>(path: P, chunk: usize) -> io::Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        info!(
            "replaying {} bytes from {}",
            data.len(),
            path.as_ref().display()
        );
        Ok(Self::from_bytes(data, chunk))
    }

    /// Replay an in-memory byte sequence
    pub fn from_bytes(data: Vec<u8>, chunk: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk: chunk.max(1),
        }
    }
}

impl ByteSource for ReplaySource {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.data.len() - self.pos;
        let n = buf.len().min(self.chunk).min(remaining);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Debug-mode sensor emitting well-formed synthetic frames.
///
/// Every `cadence`-th read yields one complete frame containing a warm blob
/// drifting over a cool floor; all other reads return zero bytes, matching
/// the duty cycle of a real sensor on a fast tick loop.
pub struct SyntheticSensor {
    reads: u64,
    cadence: u64,
}

impl SyntheticSensor {
    pub fn new(cadence: u64) -> Self {
        Self {
            reads: 0,
            cadence: cadence.max(1),
        }
    }

    /// Build one frame's worth of wire bytes for the current phase
    fn frame_bytes(&self) -> Vec<u8> {
        let mut data = vec![0u8; FRAME_LENGTH_BYTES];
        data[0] = SIGNATURE[0];
        data[1] = SIGNATURE[1];

        // Blob center orbits the grid center
        let phase = self.reads as f32 * 0.05;
        let cx = GRID_SIZE as f32 / 2.0 + 9.0 * phase.cos();
        let cy = GRID_SIZE as f32 / 2.0 + 9.0 * phase.sin();

        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                let dx = col as f32 - cx;
                let dy = row as f32 - cy;
                let falloff = (-(dx * dx + dy * dy) / 24.0).exp();
                // Floor at 18.0 C, blob peaks near 33.0 C, in tenths
                let tenths = (180.0 + 150.0 * falloff) as i16;

                let i = row * GRID_SIZE + col;
                let le = tenths.to_le_bytes();
                data[PAYLOAD_OFFSET + i * 2] = le[0];
                data[PAYLOAD_OFFSET + i * 2 + 1] = le[1];
            }
        }

        data
    }
}

impl ByteSource for SyntheticSensor {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        if self.reads % self.cadence != 0 {
            return Ok(0);
        }

        let frame = self.frame_bytes();
        let n = buf.len().min(frame.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }
}
