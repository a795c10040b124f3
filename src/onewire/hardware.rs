use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

// sleeping has a granularity far above the slot timings; spin on the
// monotonic clock instead
pub fn busy_wait(duration: Duration) {
	let start = Instant::now();
	while start.elapsed() < duration {
		std::hint::spin_loop();
	}
}

/// Access to the open-drain bus line and the clock
pub trait Hardware {
	// `false` actively drives the line low, `true` releases it (the pull-up
	// floats it high unless a device holds it low)
	fn set_line(&mut self, level: bool);
	fn read_line(&mut self) -> bool;

	fn delay_us(&mut self, us: u32) {
		busy_wait(Duration::from_micros(us as u64));
	}

	fn delay_ms(&mut self, ms: u32) {
		reliable_sleep(Duration::from_millis(ms as u64));
	}
}
