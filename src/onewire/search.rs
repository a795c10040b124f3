use super::{
	OneWire,
	RomId,
	rom_commands::SEARCH_ROM,
};
use crate::Error;
use crate::crc::crc8;

/// Search ROM on a bus expected to carry exactly one device.
///
/// For each of the 64 ROM bits all participating devices send the bit and
/// its complement (wired-AND), and the master echoes the bit it follows:
/// - (1, 1): nobody is participating anymore
/// - (0, 0): devices disagree; no branch-and-retry here, that is reported as
///   a collision
///
/// The assembled ROM must pass the CRC-8 check and carry `expected_family`.
pub fn search_single<B: OneWire + ?Sized>(bus: &mut B, expected_family: u8) -> Result<RomId, Error> {
	let mut rom = [0u8; 8];

	if !bus.reset()? {
		return Err(Error::NoPresence);
	}
	bus.write_byte(SEARCH_ROM);

	for bit in 0..64u8 {
		let id_bit = bus.read_bit();
		let cmp_bit = bus.read_bit();
		match (id_bit, cmp_bit) {
			(true, true) => {
				debug!("search: no device answered at ROM bit {}", bit);
				return Err(Error::NoPresence);
			},
			(false, false) => return Err(Error::BusCollision { bit }),
			_ => (),
		}
		if id_bit {
			rom[(bit / 8) as usize] |= 1 << (bit % 8);
		}
		bus.write_bit(id_bit);
	}

	let rom = RomId(rom);
	let computed = crc8(&rom.0[..7]);
	if computed != rom.crc() {
		return Err(Error::RomCrcInvalid { rom, computed });
	}
	if rom.family() != expected_family {
		return Err(Error::FamilyMismatch { found: rom.family(), expected: expected_family });
	}

	debug!("search: found {}", rom);
	Ok(rom)
}
