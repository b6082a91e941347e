//! Pattern generation.
//!
//! Word `i` of a pattern seeded with `start` is `start + i` modulo 2^32.
//! Source buffers are filled once through a CPU write mapping and never
//! written again.

use crate::common::constants::{BUFFER_ALIGNMENT, SOURCE_LABEL, WORD_SIZE};
use crate::common::{Buffer, DeviceError};
use crate::device::Session;
use tracing::debug;

/// Returns the expected value of word `index` for a pattern seeded with `start`.
pub fn expected_word(start: u32, index: usize) -> u32 {
    start.wrapping_add(index as u32)
}

/// Writes the pattern into `bytes`, in address order.
pub fn write_words(bytes: &mut [u8], start: u32) {
    for (i, word) in bytes.chunks_exact_mut(WORD_SIZE).enumerate() {
        word.copy_from_slice(&expected_word(start, i).to_ne_bytes());
    }
}

/// Fills a whole buffer with the pattern seeded by `start`.
///
/// The mapping is acquired, fully written and released within the call.
pub fn fill(session: &mut Session, buffer: &Buffer, start: u32) -> Result<(), DeviceError> {
    session.with_write_mapping(buffer, &mut |bytes| write_words(bytes, start))?;
    debug!(handle = %buffer.handle(), start, "filled pattern");
    Ok(())
}

/// Allocates a source buffer of `size` bytes and fills it with the pattern.
pub fn create_source(
    session: &mut Session,
    size: usize,
    start: u32,
) -> Result<Buffer, DeviceError> {
    let buffer = session.alloc(SOURCE_LABEL, size, BUFFER_ALIGNMENT)?;
    if let Err(e) = fill(session, &buffer, start) {
        let _ = session.release(buffer);
        return Err(e);
    }
    Ok(buffer)
}
