//! Readback verification.
//!
//! Two strategies read the same pattern back through different paths of the
//! kernel: one read of the whole buffer exercises the whole-buffer flush,
//! page-sized reads exercise the ranged flush. Both stop at the first wrong
//! word and report it as a [`Mismatch`].

use crate::common::constants::{SENTINEL, WORD_SIZE};
use crate::common::{Buffer, Mismatch, ReadStrategy, ScenarioError};
use crate::device::Session;
use crate::pattern::expected_word;

/// Verifies `buffer` against the pattern seeded by `start` using `strategy`.
///
/// `chunk_size` is only used by the small-read strategy.
pub fn verify(
    session: &mut Session,
    buffer: &Buffer,
    start: u32,
    strategy: ReadStrategy,
    chunk_size: usize,
) -> Result<(), ScenarioError> {
    match strategy {
        ReadStrategy::Large => verify_large_read(session, buffer, start),
        ReadStrategy::Small => verify_small_read(session, buffer, start, chunk_size),
    }
}

/// Reads the whole buffer with one request and checks every word.
pub fn verify_large_read(
    session: &mut Session,
    buffer: &Buffer,
    start: u32,
) -> Result<(), ScenarioError> {
    let mut scratch = vec![0u8; buffer.size()];
    session.read_range(buffer, 0, &mut scratch)?;
    session.stats_mut().large_reads += 1;
    check_words(&scratch, 0, start, ReadStrategy::Large)?;
    Ok(())
}

/// Reads the buffer one `chunk_size` chunk at a time and checks every word.
///
/// The scratch chunk is refilled with [`SENTINEL`] before each read so a
/// short read shows up as a mismatch rather than as stale data from the
/// previous chunk. The expected value keeps counting across chunks.
pub fn verify_small_read(
    session: &mut Session,
    buffer: &Buffer,
    start: u32,
    chunk_size: usize,
) -> Result<(), ScenarioError> {
    let chunk_size = chunk_size.max(WORD_SIZE);
    let mut scratch = vec![0u8; chunk_size];
    let mut offset = 0;
    while offset < buffer.size() {
        let len = chunk_size.min(buffer.size() - offset);
        let chunk = &mut scratch[..len];
        fill_sentinel(chunk);
        session.read_range(buffer, offset, chunk)?;
        check_words(chunk, offset, start, ReadStrategy::Small)?;
        offset += len;
    }
    session.stats_mut().small_reads += 1;
    Ok(())
}

fn fill_sentinel(bytes: &mut [u8]) {
    for word in bytes.chunks_exact_mut(WORD_SIZE) {
        word.copy_from_slice(&SENTINEL.to_ne_bytes());
    }
}

/// Checks `bytes`, which were read from byte `base_offset` of the buffer.
///
/// # Returns
///
/// The first word that differs, with its absolute byte offset.
pub fn check_words(
    bytes: &[u8],
    base_offset: usize,
    start: u32,
    strategy: ReadStrategy,
) -> Result<(), Mismatch> {
    let first_index = base_offset / WORD_SIZE;
    for (i, word) in bytes.chunks_exact(WORD_SIZE).enumerate() {
        let actual = u32::from_ne_bytes([word[0], word[1], word[2], word[3]]);
        let expected = expected_word(start, first_index + i);
        if actual != expected {
            return Err(Mismatch {
                strategy,
                offset: base_offset + i * WORD_SIZE,
                expected,
                actual,
            });
        }
    }
    Ok(())
}
