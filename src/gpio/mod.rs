/// Host side board I/O: drive the bus line through a Linux GPIO.
///
/// The line needs an external pull-up (4.7kΩ); it is never driven high.

mod realtime;
mod sysfs;

pub use self::realtime::RealtimeGuard;
pub use self::sysfs::{
	GpioLine,
	SysfsLine,
};
