/// Protocol for Maxim DS2431, a 1024-bit single-wire EEPROM (16 rows of 8
/// bytes in the data memory).
///
/// Memory is never written directly: a row is staged in the 8-byte
/// scratchpad, read back for verification and then copied into the EEPROM
/// cells.
///
/// Function commands (after a ROM command addressed the device):
/// - 0x0F WRITE SCRATCHPAD: TA1, TA2, data; device answers inverted CRC-16
///   over command, address and data
/// - 0xAA READ SCRATCHPAD: device sends TA1, TA2, E/S, data, inverted CRC-16
///   over command, address, E/S and data
/// - 0x55 COPY SCRATCHPAD: TA1, TA2, E/S as authorization; after the
///   programming time the device sends 0xAA on success
/// - 0xF0 READ MEMORY: TA1, TA2; device sends memory from there on

mod eeprom;

pub use self::eeprom::Ds2431;

use crate::Error;
use crate::crc::{
	crc16,
	crc16_from_inverted,
	inverted_crc16_bytes,
};
use crate::onewire::{
	OneWire,
	RomId,
	select,
};

pub const FAMILY_CODE: u8 = 0x2D;

pub const ROW_SIZE: usize = 8;
pub const ROW_COUNT: u8 = 16;

pub(crate) mod consts {
	pub const WRITE_SCRATCHPAD: u8 = 0x0F;
	pub const READ_SCRATCHPAD: u8 = 0xAA;
	pub const COPY_SCRATCHPAD: u8 = 0x55;
	pub const READ_MEMORY: u8 = 0xF0;

	// E/S after staging a full row: ending offset 7, no partial byte, not yet copied
	pub const STATUS_FULL_ROW: u8 = 0x07;
	pub const COPY_SUCCESS: u8 = 0xAA;

	// worst case EEPROM programming time
	pub const PROGRAM_TIME_MS: u32 = 15;
}

use self::consts::*;

fn row_address(row: u8) -> Result<u16, Error> {
	if row >= ROW_COUNT {
		return Err(Error::InvalidRow { row });
	}
	Ok(row as u16 * ROW_SIZE as u16)
}

fn start_read<B: OneWire + ?Sized>(bus: &mut B, rom: &RomId, row: u8) -> Result<(), Error> {
	let address = row_address(row)?;
	select(bus, rom)?;
	bus.write_byte(READ_MEMORY);
	bus.write_byte(address as u8);
	bus.write_byte((address >> 8) as u8);
	Ok(())
}

/// Read the first byte of a row; no integrity check
pub fn read<B: OneWire + ?Sized>(bus: &mut B, rom: &RomId, row: u8) -> Result<u8, Error> {
	start_read(bus, rom, row)?;
	Ok(bus.read_byte())
}

/// Read a full row; no integrity check
pub fn read_row<B: OneWire + ?Sized>(bus: &mut B, rom: &RomId, row: u8) -> Result<[u8; ROW_SIZE], Error> {
	start_read(bus, rom, row)?;
	let mut data = [0u8; ROW_SIZE];
	bus.read_bytes(&mut data);
	Ok(data)
}

/// Write a full row: stage it in the scratchpad, check the scratchpad
/// status (and its content if the staging CRC didn't match), then copy it
/// into the EEPROM.
///
/// Nothing is retried; a failed write can be repeated from scratch.
pub fn write<B: OneWire + ?Sized>(bus: &mut B, rom: &RomId, payload: &[u8; ROW_SIZE], row: u8) -> Result<(), Error> {
	let address = row_address(row)?;

	// [command, TA1, TA2, data...]; the copy phase reuses the header
	let mut buffer = [0u8; 3 + ROW_SIZE];
	buffer[0] = WRITE_SCRATCHPAD;
	buffer[1] = address as u8;
	buffer[2] = (address >> 8) as u8;
	buffer[3..].copy_from_slice(payload);

	// stage
	select(bus, rom)?;
	bus.write_bytes(&buffer);
	let mut received = [0u8; 2];
	bus.read_bytes(&mut received);
	let needs_verify = inverted_crc16_bytes(&buffer) != received;
	if needs_verify {
		warn!("DS2431 {}: write scratchpad CRC mismatch (computed 0x{:04x}, device sent 0x{:04x}), verifying scratchpad",
			rom, crc16(&buffer), crc16_from_inverted(received));
	}

	// read back
	select(bus, rom)?;
	bus.write_byte(READ_SCRATCHPAD);
	let mut readback = [0u8; 4 + ROW_SIZE];
	readback[0] = READ_SCRATCHPAD;
	bus.read_bytes(&mut readback[1..4]);
	let status = readback[3];
	if status != STATUS_FULL_ROW {
		return Err(Error::ScratchpadStatusInvalid { status });
	}
	if needs_verify {
		bus.read_bytes(&mut readback[4..]);
		bus.read_bytes(&mut received);
		if inverted_crc16_bytes(&readback) != received {
			return Err(Error::PayloadCrcInvalid {
				computed: crc16(&readback),
				received: crc16_from_inverted(received),
			});
		}
		debug!("DS2431 {}: scratchpad verified", rom);
	}

	// commit
	buffer[0] = COPY_SCRATCHPAD;
	buffer[3] = status;
	select(bus, rom)?;
	bus.write_bytes(&buffer[..4]);
	bus.wait_ms(PROGRAM_TIME_MS);
	let response = bus.read_byte();
	if response != COPY_SUCCESS {
		return Err(Error::CommitFailed { response });
	}

	debug!("DS2431 {}: row {} written", rom, row);
	Ok(())
}
