//! Run statistics collection and reporting.
//!
//! Tracks how much work the scenarios pushed through the device (copies,
//! reads, retried interruptions) and how many scenarios completed or were
//! skipped.

use serde::Serialize;
use std::time::Instant;

/// Counters accumulated by a [`Session`](crate::device::Session).
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    #[serde(skip)]
    start_time: Instant,

    pub copies: u64,
    pub large_reads: u64,
    pub small_reads: u64,
    pub chunk_reads: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,

    pub interrupted_retries: u64,
    pub signals_received: u64,
    pub iterations: u64,

    pub scenarios_completed: u64,
    pub scenarios_skipped: u64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            copies: 0,
            large_reads: 0,
            small_reads: 0,
            chunk_reads: 0,
            bytes_read: 0,
            bytes_written: 0,
            interrupted_retries: 0,
            signals_received: 0,
            iterations: 0,
            scenarios_completed: 0,
            scenarios_skipped: 0,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    host_seconds: f64,
    #[serde(flatten)]
    stats: &'a RunStats,
}

impl RunStats {
    /// Returns seconds elapsed since the statistics were created.
    pub fn host_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Serializes the counters together with the elapsed host time.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Report {
            host_seconds: self.host_seconds(),
            stats: self,
        })
    }

    /// Prints a formatted summary of the run.
    pub fn print(&self) {
        let seconds = self.host_seconds();
        let mib_read = self.bytes_read as f64 / (1024.0 * 1024.0);

        println!("\n==========================================================");
        println!("BLIT READBACK STATISTICS");
        println!("==========================================================");
        println!("host_seconds             {:.4} s", seconds);
        println!("scenarios.completed      {}", self.scenarios_completed);
        println!("scenarios.skipped        {}", self.scenarios_skipped);
        println!("iterations               {}", self.iterations);
        println!("----------------------------------------------------------");
        println!("DEVICE TRAFFIC");
        println!("  copies                 {}", self.copies);
        println!("  reads.large            {}", self.large_reads);
        println!("  reads.small            {}", self.small_reads);
        println!("  reads.chunks           {}", self.chunk_reads);
        println!("  bytes.read             {} ({:.2} MiB)", self.bytes_read, mib_read);
        println!("  bytes.written          {}", self.bytes_written);
        println!("----------------------------------------------------------");
        println!("INTERRUPTIONS");
        println!("  retries                {}", self.interrupted_retries);
        println!("  signals.received       {}", self.signals_received);
        println!("==========================================================");
    }
}
