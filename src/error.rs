use failure::Fail;

use crate::onewire::RomId;

/// Failures of the single-wire bus and the EEPROM transactions on it
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum Error {
	#[fail(display = "bus line never floated high before reset (wiring fault?)")]
	BusTimeout,
	#[fail(display = "no device on the bus")]
	NoPresence,
	#[fail(display = "more than one device answered at ROM bit {}", bit)]
	BusCollision { bit: u8 },
	#[fail(display = "ROM {:?} failed CRC-8 check (computed 0x{:02x})", rom, computed)]
	RomCrcInvalid { rom: RomId, computed: u8 },
	#[fail(display = "unexpected family code 0x{:02x} (expected 0x{:02x})", found, expected)]
	FamilyMismatch { found: u8, expected: u8 },
	#[fail(display = "scratchpad status 0x{:02x} doesn't cover a full row", status)]
	ScratchpadStatusInvalid { status: u8 },
	#[fail(display = "scratchpad CRC-16 mismatch: computed 0x{:04x}, device sent 0x{:04x}", computed, received)]
	PayloadCrcInvalid { computed: u16, received: u16 },
	#[fail(display = "copy scratchpad failed: device answered 0x{:02x}", response)]
	CommitFailed { response: u8 },
	#[fail(display = "row {} out of range", row)]
	InvalidRow { row: u8 },
}
