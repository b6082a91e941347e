//! Reference scenario constants.
//!
//! These values describe the reference run: two 1 MiB sources viewed as
//! 512x512 surfaces of 32-bit pixels, read back in 4 KiB pages.

/// Size of every source and destination buffer in bytes.
pub const BUFFER_SIZE: usize = 1024 * 1024;

/// Allocation alignment requested from the buffer manager.
pub const BUFFER_ALIGNMENT: usize = 4096;

/// Surface width in pixels used for the blit.
pub const SURFACE_WIDTH: u32 = 512;

/// Surface height in pixels used for the blit.
pub const SURFACE_HEIGHT: u32 = 512;

/// Bytes per pixel of the blitted surface.
pub const BYTES_PER_PIXEL: usize = 4;

/// Bytes per pattern word.
pub const WORD_SIZE: usize = 4;

/// Chunk size of the small-read verifier (matches the Mesa software fallback read size).
pub const PAGE_SIZE: usize = 4096;

/// Value written into the small-read scratch array before each chunk read.
pub const SENTINEL: u32 = 0x00C0_FFEE;

/// Repeat count of the interruptible variants.
pub const STRESS_LOOPS: u32 = 100;

/// Pattern seeds of the two source buffers.
pub const SOURCE_STARTS: [u32; 2] = [0, (BUFFER_SIZE / WORD_SIZE) as u32];

/// Exit status reported when the whole run is skipped.
pub const EXIT_SKIP: i32 = 77;

/// Label of the pattern-filled source buffers.
pub const SOURCE_LABEL: &str = "src bo";

/// Label of the scratch destination buffers.
pub const DESTINATION_LABEL: &str = "dst bo";
