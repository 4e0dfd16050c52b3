//! Best-effort real-time setup for the sensing loop.
//!
//! Linux: `mlockall(MCL_CURRENT|MCL_FUTURE)` (falling back to `MCL_CURRENT`)
//! and `SCHED_FIFO`. macOS: `mlockall` only. Failures are logged; the loop
//! runs either way.

use std::sync::OnceLock;

static RT_ONCE: OnceLock<()> = OnceLock::new();

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn lock_memory() -> eyre::Result<&'static str> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    let rc = unsafe { mlockall(MCL_CURRENT | MCL_FUTURE) };
    if rc == 0 {
        return Ok("current|future");
    }
    let all_err = std::io::Error::last_os_error();
    let rc = unsafe { mlockall(MCL_CURRENT) };
    if rc == 0 {
        tracing::debug!(error = %all_err, "mlockall(current|future) refused; locked current pages");
        return Ok("current");
    }
    let err = std::io::Error::last_os_error();
    eyre::bail!("mlockall failed: {err}; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'")
}

#[cfg(target_os = "linux")]
fn fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    let (min, max) = unsafe {
        let min = sched_get_priority_min(SCHED_FIFO);
        let max = sched_get_priority_max(SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    let prio_val = prio.unwrap_or(max).clamp(min, max);
    let param = sched_param {
        sched_priority: prio_val,
    };
    let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        eyre::bail!(
            "sched_setscheduler(SCHED_FIFO, {prio_val}) failed: {err}; hint: needs CAP_SYS_NICE or root"
        );
    }
    Ok(prio_val)
}

/// Apply real-time settings once per process. No-op when `rt` is false.
pub fn setup_rt_once(rt: bool, prio: Option<i32>) {
    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            match lock_memory() {
                Ok(mode) => tracing::info!(mode, "RT: memory locked"),
                Err(err) => tracing::warn!("RT: {err}"),
            }
        }

        #[cfg(target_os = "linux")]
        {
            match fifo_priority(prio) {
                Ok(p) => tracing::info!(priority = p, "RT: SCHED_FIFO"),
                Err(err) => tracing::warn!("RT: {err}"),
            }
        }

        #[cfg(not(target_os = "linux"))]
        {
            let _ = prio;
            tracing::warn!("RT: SCHED_FIFO is only available on Linux");
        }
    });
}
