//! Best-effort process statistics for worker responses.
//!
//! Workers report their own CPU and resident memory alongside each similarity
//! response. The numbers are advisory; when the platform offers nothing, both
//! fields are zero and the response is still valid.

use sysinfo::{Pid, System};

/// Point-in-time process statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessStats {
    /// CPU usage percentage since the previous refresh; 0.0 on first sample.
    pub cpu_usage: f32,
    /// Resident set size in MiB.
    pub memory_mb: u64,
}

/// Sample CPU and memory for the current process.
pub fn sample_process() -> ProcessStats {
    let mut system = System::new();
    let pid = Pid::from(std::process::id() as usize);
    system.refresh_process(pid);

    match system.process(pid) {
        Some(proc) => ProcessStats {
            cpu_usage: proc.cpu_usage(),
            memory_mb: proc.memory() / (1024 * 1024),
        },
        None => ProcessStats::default(),
    }
}
