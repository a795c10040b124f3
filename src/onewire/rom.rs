use std::fmt;
use std::str;

use super::{
	OneWire,
	rom_commands::MATCH_ROM,
};
use crate::crc::crc8;

/// 64-bit device address: family code, 48-bit serial (LSB first), CRC-8
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RomId(pub [u8; 8]);

impl RomId {
	pub fn from_parts(family: u8, serial: u64) -> Self {
		let mut rom = [0u8; 8];
		rom[0] = family;
		for i in 0..6 {
			rom[1 + i] = (serial >> (8 * i)) as u8;
		}
		rom[7] = crc8(&rom[..7]);
		RomId(rom)
	}

	pub fn family(&self) -> u8 {
		self.0[0]
	}

	pub fn serial(&self) -> u64 {
		self.0[1..7].iter().rev().fold(0u64, |acc, &b| acc << 8 | b as u64)
	}

	pub fn crc(&self) -> u8 {
		self.0[7]
	}

	pub fn is_valid(&self) -> bool {
		crc8(&self.0[..7]) == self.0[7]
	}

	pub fn as_bytes(&self) -> &[u8; 8] {
		&self.0
	}
}

impl fmt::Display for RomId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{:02x}-{:012x}", self.family(), self.serial())
	}
}

impl fmt::Debug for RomId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{} (crc: 0x{:02x}", self, self.crc())?;
		if !self.is_valid() { write!(f, " [INVALID]")?; }
		write!(f, ")")
	}
}

impl str::FromStr for RomId {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		// family-serial: 2d-00000a1b2c3d
		ensure!(s.len() == 15, "ROM id must look like ff-ssssssssssss: {:?}", s);
		let r = s.as_bytes();
		ensure!(r[2] == b'-', "Couldn't find '-' after family code in ROM id: {:?}", s);

		let (family_s, serial_s) = (&s[0..2], &s[3..]);
		ensure!(
			family_s.bytes().chain(serial_s.bytes()).all(|b| b.is_ascii_hexdigit()),
			"ROM id contains non-hex digits: {:?}", s
		);

		let family = with_context!(("invalid ROM family code: {}", family_s),
			Ok(u8::from_str_radix(family_s, 16)?)
		)?;
		let serial = with_context!(("invalid ROM serial: {}", serial_s),
			Ok(u64::from_str_radix(serial_s, 16)?)
		)?;

		Ok(RomId::from_parts(family, serial))
	}
}

/// Address the device with the given ROM id for the following function
/// command.
///
/// The presence result of the reset is ignored: without a device the
/// function command that follows simply reads back an idle (high) bus.
pub fn select<B: OneWire + ?Sized>(bus: &mut B, rom: &RomId) -> Result<(), crate::Error> {
	if !bus.reset()? {
		debug!("no presence pulse while selecting {}", rom);
	}
	bus.write_byte(MATCH_ROM);
	bus.write_bytes(rom.as_bytes());
	Ok(())
}
