use crate::{
    error::InternalError,
    serialize::{decode, encode},
    sort::{SegmentId, SortValue},
};
use std::{
    io::{ErrorKind, Read},
    marker::PhantomData,
};

///
/// Run frame codec
///
/// A run is a sequence of frames, one per value:
/// `u32 LE payload length || CBOR payload`.
/// The frame count of each run is tracked by the sorter, not stored in the run.
///

const FRAME_HEADER_BYTES: usize = 4;

/// Encode one value as a run frame.
pub(super) fn encode_frame<T: SortValue>(
    value: &T,
    max_frame_bytes: usize,
) -> Result<Vec<u8>, InternalError> {
    let payload = encode(value, max_frame_bytes)?;
    let len = u32::try_from(payload.len()).map_err(|_| {
        InternalError::serialize_internal("encoded value does not fit a 32-bit frame header")
    })?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_BYTES + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);

    Ok(frame)
}

///
/// RunReader
///
/// Streams the values of one sealed run, holding at most one decoded frame.
///

pub(super) struct RunReader<T, R> {
    reader: R,
    segment: SegmentId,
    remaining: u64,
    read: u64,
    max_frame_bytes: usize,
    scratch: Vec<u8>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: SortValue, R: Read> RunReader<T, R> {
    pub(super) const fn new(
        reader: R,
        segment: SegmentId,
        frames: u64,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            reader,
            segment,
            remaining: frames,
            read: 0,
            max_frame_bytes,
            scratch: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Decode the next value, or `None` once the recorded frame count is read.
    pub(super) fn next_value(&mut self) -> Result<Option<T>, InternalError> {
        if self.remaining == 0 {
            self.expect_end()?;
            return Ok(None);
        }

        let mut header = [0u8; FRAME_HEADER_BYTES];
        self.read_exact(&mut header)?;
        let len = u32::from_le_bytes(header) as usize;
        if len > self.max_frame_bytes {
            return Err(InternalError::spill_corruption(format!(
                "{} frame {} declares {len} bytes, limit is {}",
                self.segment, self.read, self.max_frame_bytes
            )));
        }

        self.scratch.resize(len, 0);
        let mut payload = std::mem::take(&mut self.scratch);
        let filled = self.read_exact(&mut payload);
        self.scratch = payload;
        filled?;

        let value = decode(&self.scratch, self.max_frame_bytes).map_err(|err| {
            InternalError::spill_corruption(format!("{} frame {}: {err}", self.segment, self.read))
        })?;

        self.remaining -= 1;
        self.read += 1;

        Ok(Some(value))
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InternalError> {
        self.reader.read_exact(buf).map_err(|err| {
            if err.kind() == ErrorKind::UnexpectedEof {
                InternalError::spill_corruption(format!(
                    "{} ended after {} of {} frames",
                    self.segment,
                    self.read,
                    self.read + self.remaining
                ))
            } else {
                InternalError::spill_io(&format!("could not read {}", self.segment), &err)
            }
        })
    }

    // A run must not hold more frames than were written to it.
    fn expect_end(&mut self) -> Result<(), InternalError> {
        let mut probe = [0u8; 1];
        match self.reader.read(&mut probe) {
            Ok(0) => Ok(()),
            Ok(_) => Err(InternalError::spill_corruption(format!(
                "{} holds data past its {} recorded frames",
                self.segment, self.read
            ))),
            Err(err) => Err(InternalError::spill_io(
                &format!("could not read {}", self.segment),
                &err,
            )),
        }
    }
}
