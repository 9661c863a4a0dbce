//! Control channel over a serial byte stream.

use embedded_io::{Read, ReadReady, Write};
use embedded_storage::nor_flash::NorFlash;
use equalizer::ParametricEq;
use platform::UpdateModeTrigger;

use crate::frame::FrameParser;
use crate::handler::{handle, FollowUp};
use crate::response::Response;

/// Bytes pulled from the stream per read call.
const READ_CHUNK: usize = 64;

/// Frame parser and response buffer bound to one byte stream (USB CDC on the
/// target).
pub struct ControlChannel<IO> {
    io: IO,
    parser: FrameParser,
    response: Response,
}

impl<IO> ControlChannel<IO>
where
    IO: Read + ReadReady + Write,
{
    /// Wrap a byte stream.
    pub fn new(io: IO) -> Self {
        Self {
            io,
            parser: FrameParser::new(),
            response: Response::new(),
        }
    }

    /// Drain whatever the stream has buffered, answering every complete
    /// frame. Returns the number of frames answered.
    ///
    /// Never waits for more bytes; a partial frame stays in the parser until
    /// the next call. A failed response write does not stop parsing: the rest
    /// of the chunk already read is still handled, then the first write error
    /// is returned.
    pub fn poll<F, U>(
        &mut self,
        eq: &mut ParametricEq<F>,
        update: &mut U,
    ) -> Result<usize, IO::Error>
    where
        F: NorFlash,
        U: UpdateModeTrigger,
    {
        let Self { io, parser, response } = self;
        let mut answered = 0usize;
        let mut chunk = [0u8; READ_CHUNK];

        while io.read_ready()? {
            let n = io.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            let mut write_error = None;
            for &byte in chunk.get(..n).unwrap_or(&[]) {
                let Some(frame) = parser.push(byte) else {
                    continue;
                };
                let follow_up = handle(&frame, eq, response);
                match send(io, response.seal()) {
                    Ok(()) => answered = answered.saturating_add(1),
                    Err(e) => {
                        warn!("response to command {} not sent", frame.command);
                        if write_error.is_none() {
                            write_error = Some(e);
                        }
                    }
                }

                if follow_up == FollowUp::EnterUpdateMode {
                    update.enter_update_mode();
                }
            }
            if let Some(e) = write_error {
                return Err(e);
            }
        }
        Ok(answered)
    }

    /// Parser state, for diagnostics.
    pub fn parser(&self) -> &FrameParser {
        &self.parser
    }

    /// The underlying stream.
    pub fn io(&self) -> &IO {
        &self.io
    }

    /// The underlying stream, mutably.
    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    /// Give the stream back.
    pub fn release(self) -> IO {
        self.io
    }
}

fn send<IO: Write>(io: &mut IO, bytes: &[u8]) -> Result<(), IO::Error> {
    io.write_all(bytes)?;
    io.flush()
}
