/// Single-wire bus ("1-Wire") master, bit-banged over one open-drain line.
///
/// Every transaction starts with a reset pulse; devices answer with a
/// presence pulse. Then a ROM command addresses a device (or searches for
/// one), followed by device specific function commands.
///
/// Bits are sent in time slots of ~70µs started by the master pulling the
/// line low:
/// - write 1: short low pulse, then release
/// - write 0: hold low for (almost) the whole slot
/// - read: short low pulse, release, sample; a device sending 0 keeps the
///   line low past the sample point
///
/// Bytes are sent least significant bit first.

mod hardware;
mod low_level;
mod rom;
mod search;

pub use self::hardware::{
	Hardware,
	busy_wait,
	reliable_sleep,
};

pub use self::low_level::{
	OneWire,
	timing,
};

pub use self::rom::{
	RomId,
	select,
};

pub use self::search::{
	search_single,
};

/// ROM command codes
pub mod rom_commands {
	pub const SEARCH_ROM: u8 = 0xF0;
	pub const MATCH_ROM: u8 = 0x55;
}
