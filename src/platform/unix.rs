//! SIGPROF-driven sampling on POSIX hosts.
//!
//! Two pieces live here. [`ItimerTimer`] arms the process profiling timer
//! (`ITIMER_PROF`), which counts CPU time rather than wall time and raises
//! SIGPROF at each expiry. [`SignalProfiler`] owns a [`Profiler`] together
//! with the installed handler and makes the two sides take turns through a
//! checkout protocol: one static slot holds a pointer to the tick closure,
//! and whoever swaps it out, handler or control surface, has exclusive use
//! of the profiler until the slot is restored. A tick that fires while the
//! slot is empty is dropped, never queued, so the handler can never observe
//! a half-finished rotation and a rotation can never race a tick.

use std::io;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::time::Duration;

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::config::ProfilerConfig;
use crate::error::{ProfilerError, Result};
use crate::frames::FrameSource;
use crate::log::SampleLog;
use crate::profiler::Profiler;
use crate::timer::SampleTimer;

type TickFn = Box<dyn FnMut()>;

/// Slot holding the active tick closure. Null whenever nobody may tick:
/// either no profiler is armed, or the current owner (handler or control
/// surface) has it checked out.
static ACTIVE_TICK: AtomicPtr<TickFn> = AtomicPtr::new(ptr::null_mut());

/// One SIGPROF-driven profiler per process.
static HANDLER_CLAIMED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigprof(_signum: libc::c_int) {
    let tick = ACTIVE_TICK.swap(ptr::null_mut(), Ordering::Acquire);
    if tick.is_null() {
        // The control surface has the profiler checked out; drop the tick.
        return;
    }
    // Safety: the swap above made this handler the sole owner of the
    // closure until the store below returns it.
    unsafe { (*tick)() };
    ACTIVE_TICK.store(tick, Ordering::Release);
}

/// Interval timer measured against process CPU time.
///
/// Arming sets both the initial expiry and the repeat interval, and the
/// kernel delivers SIGPROF on each expiry. Disarming only zeroes the timer;
/// whatever handler is installed stays installed.
#[derive(Debug, Default)]
pub struct ItimerTimer;

impl ItimerTimer {
    pub fn new() -> Self {
        ItimerTimer
    }
}

impl SampleTimer for ItimerTimer {
    fn arm(&mut self, interval: Duration) -> io::Result<()> {
        let tv = timeval_from(interval);
        set_profiling_timer(libc::itimerval {
            it_interval: tv,
            it_value: tv,
        })
    }

    fn disarm(&mut self) -> io::Result<()> {
        let zero = libc::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        set_profiling_timer(libc::itimerval {
            it_interval: zero,
            it_value: zero,
        })
    }
}

fn set_profiling_timer(timer: libc::itimerval) -> io::Result<()> {
    // Safety: plain syscall over a stack-local argument.
    let rc = unsafe { libc::setitimer(libc::ITIMER_PROF, &timer, ptr::null_mut()) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn timeval_from(interval: Duration) -> libc::timeval {
    // At least one microsecond, so the timer actually fires.
    let micros = interval.as_micros().max(1);
    libc::timeval {
        tv_sec: (micros / 1_000_000) as libc::time_t,
        tv_usec: (micros % 1_000_000) as libc::suseconds_t,
    }
}

/// A [`Profiler`] driven by SIGPROF.
///
/// Mirrors the profiler's control surface; every operation, including the
/// read-only ones, parks the handler first because the tick closure holds a
/// raw pointer into the same state. Dropping the instance disarms the
/// timer, retires the tick slot and restores the previous signal action.
pub struct SignalProfiler<S: FrameSource + 'static> {
    // Owned allocations, freed in drop. Held raw so the pointer in the
    // tick slot and the one captured by the closure stay valid across
    // moves of this struct.
    inner: *mut Profiler<S>,
    tick: *mut TickFn,
    prev: Option<SigAction>,
    installed: bool,
}

impl<S: FrameSource + 'static> SignalProfiler<S> {
    /// Claim the process-wide SIGPROF slot and wrap a profiler around
    /// `source`. At most one instance exists at a time; the claim is
    /// released on drop.
    pub fn new(source: S, config: ProfilerConfig) -> Result<Self> {
        if HANDLER_CLAIMED.swap(true, Ordering::SeqCst) {
            return Err(ProfilerError::HandlerClaimed);
        }
        let inner = Box::into_raw(Box::new(Profiler::with_timer(
            source,
            config,
            Box::new(ItimerTimer::new()),
        )));
        // Safety: the allocation lives until drop frees it, and exclusive
        // use is arranged by the checkout protocol around ACTIVE_TICK.
        let tick: TickFn = Box::new(move || unsafe { (*inner).handle_tick() });
        Ok(SignalProfiler {
            inner,
            tick: Box::into_raw(Box::new(tick)),
            prev: None,
            installed: false,
        })
    }

    /// Start CPU sampling at `interval`, installing the SIGPROF handler on
    /// first use. The handler survives a later stop; only the timer is
    /// disarmed.
    pub fn start_cpu(&mut self, interval: Duration) -> Result<()> {
        self.install()?;
        self.with_handler_parked(|profiler| profiler.start_cpu(interval))
    }

    pub fn stop_cpu(&mut self) -> bool {
        self.with_handler_parked(|profiler| profiler.stop_cpu())
    }

    pub fn cpu_running(&mut self) -> bool {
        self.with_handler_parked(|profiler| profiler.cpu_running())
    }

    pub fn read_cpu_log(&mut self) -> Option<SampleLog> {
        self.with_handler_parked(|profiler| profiler.read_cpu_log())
    }

    pub fn start_memory(&mut self) -> Result<()> {
        self.with_handler_parked(|profiler| profiler.start_memory())
    }

    pub fn stop_memory(&mut self) -> bool {
        self.with_handler_parked(|profiler| profiler.stop_memory())
    }

    pub fn memory_running(&mut self) -> bool {
        self.with_handler_parked(|profiler| profiler.memory_running())
    }

    pub fn read_memory_log(&mut self) -> Option<SampleLog> {
        self.with_handler_parked(|profiler| profiler.read_memory_log())
    }

    /// Report one host allocation of `size` bytes.
    pub fn malloc_probe(&mut self, size: usize) {
        self.with_handler_parked(|profiler| profiler.malloc_probe(size));
    }

    fn install(&mut self) -> Result<()> {
        if self.installed {
            return Ok(());
        }
        let action = SigAction::new(
            SigHandler::Handler(handle_sigprof),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        // Safety: the handler only swaps the atomic tick slot and runs the
        // checkout-owned closure.
        let prev = unsafe { signal::sigaction(Signal::SIGPROF, &action) }
            .map_err(|errno| ProfilerError::Signal(io::Error::from_raw_os_error(errno as i32)))?;
        self.prev = Some(prev);
        ACTIVE_TICK.store(self.tick, Ordering::Release);
        self.installed = true;
        tracing::debug!("SIGPROF handler installed");
        Ok(())
    }

    /// Run `f` with exclusive use of the profiler.
    ///
    /// Swaps the tick slot to null so a signal arriving meanwhile is
    /// dropped. If the slot is already null, a tick is mid-flight on
    /// another thread and will restore it shortly; spin until it does.
    fn with_handler_parked<R>(&mut self, f: impl FnOnce(&mut Profiler<S>) -> R) -> R {
        if !self.installed {
            // Safety: no handler is installed yet, so nothing else can
            // reach the profiler while `f` runs.
            return f(unsafe { &mut *self.inner });
        }
        let parked = loop {
            let tick = ACTIVE_TICK.swap(ptr::null_mut(), Ordering::Acquire);
            if !tick.is_null() {
                break tick;
            }
            std::hint::spin_loop();
        };
        // Safety: the slot is null, so a signal arriving now drops its
        // tick instead of running the closure; the reference is unique
        // until the store below returns the slot.
        let result = f(unsafe { &mut *self.inner });
        ACTIVE_TICK.store(parked, Ordering::Release);
        result
    }
}

impl<S: FrameSource + 'static> Drop for SignalProfiler<S> {
    fn drop(&mut self) {
        if self.installed {
            self.with_handler_parked(|profiler| {
                profiler.stop_cpu();
                profiler.stop_memory();
            });
            // Retire the tick slot for good; a late signal now falls
            // through to a no-op handler.
            loop {
                if !ACTIVE_TICK
                    .swap(ptr::null_mut(), Ordering::Acquire)
                    .is_null()
                {
                    break;
                }
                std::hint::spin_loop();
            }
            if let Some(prev) = self.prev.take() {
                // Safety: restores the action that was active before
                // install; our handler never runs again for this claim.
                let _ = unsafe { signal::sigaction(Signal::SIGPROF, &prev) };
            }
        }
        // Safety: both pointers came from Box::into_raw in `new`, and the
        // closure can no longer run: the slot is retired, or was never
        // armed at all.
        unsafe {
            drop(Box::from_raw(self.tick));
            drop(Box::from_raw(self.inner));
        }
        HANDLER_CLAIMED.store(false, Ordering::SeqCst);
    }
}
