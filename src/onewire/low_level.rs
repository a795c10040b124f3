use super::Hardware;
use crate::Error;

/// Slot timings in µs (standard speed); these are protocol constants
pub mod timing {
	// line must float high before a reset: poll up to 125 times, every 2µs
	pub const RESET_FLOAT_RETRIES: u32 = 125;
	pub const RESET_FLOAT_POLL: u32 = 2;
	pub const RESET_LOW: u32 = 550;
	pub const PRESENCE_SAMPLE: u32 = 70;
	pub const RESET_RECOVERY: u32 = 410;

	pub const WRITE_1_LOW: u32 = 10;
	pub const WRITE_1_RELEASE: u32 = 55;
	pub const WRITE_0_LOW: u32 = 65;
	pub const WRITE_0_RELEASE: u32 = 5;

	// read slot: 13µs low, sample 53µs after slot start, 65µs total
	pub const READ_LOW: u32 = 13;
	pub const READ_SAMPLE: u32 = 40;
	pub const READ_RECOVERY: u32 = 12;
}

/// Bit and byte level bus access; the slot primitives must run uninterrupted.
pub trait OneWire {
	/// Reset pulse; returns whether a device answered with a presence pulse
	fn reset(&mut self) -> Result<bool, Error>;
	fn write_bit(&mut self, bit: bool);
	fn read_bit(&mut self) -> bool;
	// busy wait while a device is programming its memory
	fn wait_ms(&mut self, ms: u32);

	fn write_byte(&mut self, value: u8) {
		for bit in 0..8 {
			self.write_bit(0 != value & (1 << bit));
		}
	}

	fn read_byte(&mut self) -> u8 {
		let mut result = 0u8;
		for bit in 0..8 {
			if self.read_bit() {
				result |= 1 << bit;
			}
		}
		result
	}

	fn write_bytes(&mut self, data: &[u8]) {
		for &b in data {
			self.write_byte(b);
		}
	}

	fn read_bytes(&mut self, target: &mut [u8]) {
		for t in target.iter_mut() {
			*t = self.read_byte();
		}
	}
}

impl<H: Hardware + ?Sized> OneWire for H {
	fn reset(&mut self) -> Result<bool, Error> {
		use self::timing::*;

		// make sure nothing (e.g. a short) holds the line low
		self.set_line(true);
		let mut floated = false;
		for _ in 0..RESET_FLOAT_RETRIES {
			if self.read_line() {
				floated = true;
				break;
			}
			self.delay_us(RESET_FLOAT_POLL);
		}
		if !floated {
			return Err(Error::BusTimeout);
		}

		self.set_line(false);
		self.delay_us(RESET_LOW);
		self.set_line(true);
		self.delay_us(PRESENCE_SAMPLE);
		let presence = !self.read_line();
		self.delay_us(RESET_RECOVERY);

		Ok(presence)
	}

	fn write_bit(&mut self, bit: bool) {
		use self::timing::*;

		let (low, release) = if bit {
			(WRITE_1_LOW, WRITE_1_RELEASE)
		} else {
			(WRITE_0_LOW, WRITE_0_RELEASE)
		};
		self.set_line(false);
		self.delay_us(low);
		self.set_line(true);
		self.delay_us(release);
	}

	fn read_bit(&mut self) -> bool {
		use self::timing::*;

		self.set_line(false);
		self.delay_us(READ_LOW);
		self.set_line(true);
		self.delay_us(READ_SAMPLE);
		let bit = self.read_line();
		self.delay_us(READ_RECOVERY);
		bit
	}

	fn wait_ms(&mut self, ms: u32) {
		self.delay_ms(ms);
	}
}
