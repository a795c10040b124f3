use std::io;
use std::mem;

use libc::{
	MCL_CURRENT,
	MCL_FUTURE,
	SCHED_FIFO,
	c_int,
	mlockall,
	munlockall,
	sched_get_priority_max,
	sched_getparam,
	sched_getscheduler,
	sched_param,
	sched_setscheduler,
};

/// Run the calling process with highest SCHED_FIFO priority and locked
/// memory, so bit slots aren't stretched by preemption or page faults.
///
/// Not being allowed to (usually: not root) is only logged; previous
/// scheduling is restored on drop.
pub struct RealtimeGuard {
	previous: Option<(c_int, sched_param)>,
	locked: bool,
}

impl RealtimeGuard {
	pub fn acquire() -> Self {
		RealtimeGuard {
			previous: raise_scheduling(),
			locked: lock_memory(),
		}
	}

	pub fn is_realtime(&self) -> bool {
		self.previous.is_some()
	}
}

fn raise_scheduling() -> Option<(c_int, sched_param)> {
	// NOTE(unsafe) plain syscalls on the calling process (pid 0)
	unsafe {
		let policy = sched_getscheduler(0);
		let mut previous: sched_param = mem::zeroed();
		if policy < 0 || 0 != sched_getparam(0, &mut previous) {
			warn!("Couldn't query scheduling policy: {}", io::Error::last_os_error());
			return None;
		}

		let mut fifo: sched_param = mem::zeroed();
		fifo.sched_priority = sched_get_priority_max(SCHED_FIFO);
		if 0 != sched_setscheduler(0, SCHED_FIFO, &fifo) {
			warn!("Couldn't switch to realtime scheduling, bus timing may suffer: {}", io::Error::last_os_error());
			return None;
		}
		debug!("Switched to SCHED_FIFO priority {}", fifo.sched_priority);
		Some((policy, previous))
	}
}

fn lock_memory() -> bool {
	// NOTE(unsafe) no memory is touched
	if 0 != unsafe { mlockall(MCL_CURRENT | MCL_FUTURE) } {
		warn!("Couldn't lock memory: {}", io::Error::last_os_error());
		return false;
	}
	true
}

impl Drop for RealtimeGuard {
	fn drop(&mut self) {
		if let Some((policy, param)) = self.previous.take() {
			// NOTE(unsafe) restores what sched_getscheduler/sched_getparam returned
			if 0 != unsafe { sched_setscheduler(0, policy, &param) } {
				error!("Failed to restore scheduling policy {}: {}", policy, io::Error::last_os_error());
			}
		}
		if self.locked {
			// NOTE(unsafe) no memory is touched
			if 0 != unsafe { munlockall() } {
				error!("Failed to unlock memory: {}", io::Error::last_os_error());
			}
		}
	}
}
