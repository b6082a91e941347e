//! Signal Interruption Helper.
//!
//! Interruptible subtests run with a forked helper process that keeps
//! sending `SIGUSR1` to the test process. The handler is installed without
//! `SA_RESTART`, so blocking calls in progress fail with `EINTR` and must be
//! reissued by the device layer. The handler itself only records that a
//! signal arrived; [`take_pending_interrupt`] lets a backend that does not
//! block in the kernel observe the same event.

use std::io;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

static INTERRUPT_PENDING: AtomicBool = AtomicBool::new(false);
static SIGNALS_RECEIVED: AtomicU64 = AtomicU64::new(0);

extern "C" fn on_interrupt(_signum: libc::c_int) {
    SIGNALS_RECEIVED.fetch_add(1, Ordering::Relaxed);
    INTERRUPT_PENDING.store(true, Ordering::Release);
}

/// Consumes a pending interruption, returning true if one was recorded.
pub fn take_pending_interrupt() -> bool {
    INTERRUPT_PENDING.swap(false, Ordering::AcqRel)
}

/// Total number of interruption signals handled by this process.
pub fn signals_received() -> u64 {
    SIGNALS_RECEIVED.load(Ordering::Relaxed)
}

/// Something that perturbs the timing of a scenario while it runs.
pub trait Interrupter {
    /// Starts injecting interruptions.
    fn start(&mut self) -> io::Result<()>;

    /// Stops injecting interruptions and waits until none are in flight.
    fn stop(&mut self) -> io::Result<()>;
}

/// Interrupter that does nothing.
#[derive(Debug, Default)]
pub struct NoInterrupter;

impl Interrupter for NoInterrupter {
    fn start(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Installs the interruption handler for `SIGUSR1`.
///
/// # Returns
///
/// The previously installed action, to be restored by [`restore_handler`].
pub fn install_handler() -> io::Result<libc::sigaction> {
    // SAFETY: both structs are plain C data and fully initialised before use;
    // the handler only touches atomics.
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        action.sa_sigaction = on_interrupt as extern "C" fn(libc::c_int) as usize;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        let mut previous: libc::sigaction = mem::zeroed();
        if libc::sigaction(libc::SIGUSR1, &action, &mut previous) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(previous)
    }
}

/// Restores the action returned by [`install_handler`].
///
/// `SIGUSR1` is ignored for a moment first, which discards any signal still
/// pending, so a late signal cannot reach a default (terminating) action.
pub fn restore_handler(previous: &libc::sigaction) -> io::Result<()> {
    // SAFETY: the ignore action is plain C data; `previous` was filled in by
    // the kernel.
    unsafe {
        let mut ignore: libc::sigaction = mem::zeroed();
        ignore.sa_sigaction = libc::SIG_IGN;
        libc::sigemptyset(&mut ignore.sa_mask);
        if libc::sigaction(libc::SIGUSR1, &ignore, ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::sigaction(libc::SIGUSR1, previous, ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Forked process that signals its parent at a fixed interval.
pub struct SignalHelper {
    interval: Duration,
    child: Option<libc::pid_t>,
    previous: Option<libc::sigaction>,
}

impl SignalHelper {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            child: None,
            previous: None,
        }
    }

    /// Returns true while the helper process is running.
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }
}

/// Body of the helper process. Only async-signal-safe calls are used here
/// since the parent may be multi-threaded.
fn signal_parent_forever(parent: libc::pid_t, interval: Duration) -> ! {
    let delay = libc::timespec {
        tv_sec: interval.as_secs() as libc::time_t,
        tv_nsec: interval.subsec_nanos() as libc::c_long,
    };
    loop {
        // SAFETY: nanosleep, kill, getppid and _exit are async-signal-safe.
        unsafe {
            libc::nanosleep(&delay, ptr::null_mut());
            if libc::getppid() != parent || libc::kill(parent, libc::SIGUSR1) != 0 {
                libc::_exit(0);
            }
        }
    }
}

impl Interrupter for SignalHelper {
    fn start(&mut self) -> io::Result<()> {
        if self.child.is_some() {
            return Ok(());
        }
        let previous = install_handler()?;
        // SAFETY: getpid cannot fail.
        let parent = unsafe { libc::getpid() };
        // SAFETY: the child only runs `signal_parent_forever`.
        match unsafe { libc::fork() } {
            -1 => {
                let err = io::Error::last_os_error();
                restore_handler(&previous)?;
                Err(err)
            }
            0 => signal_parent_forever(parent, self.interval),
            pid => {
                debug!(pid, interval_us = self.interval.as_micros() as u64, "signal helper started");
                self.child = Some(pid);
                self.previous = Some(previous);
                Ok(())
            }
        }
    }

    fn stop(&mut self) -> io::Result<()> {
        if let Some(pid) = self.child.take() {
            // SAFETY: pid is our own child which has not been reaped yet.
            unsafe {
                libc::kill(pid, libc::SIGKILL);
            }
            let mut status = 0;
            loop {
                // SAFETY: as above.
                let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
                if rc >= 0 {
                    break;
                }
                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::Interrupted {
                    return Err(err);
                }
            }
            debug!(pid, signals = signals_received(), "signal helper stopped");
        }
        if let Some(previous) = self.previous.take() {
            restore_handler(&previous)?;
        }
        INTERRUPT_PENDING.store(false, Ordering::Release);
        Ok(())
    }
}

impl Drop for SignalHelper {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
