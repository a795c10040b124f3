use super::{
	FAMILY_CODE,
	ROW_COUNT,
	ROW_SIZE,
};
use crate::Error;
use crate::onewire::{
	OneWire,
	RomId,
	search_single,
};

/// A DS2431 as the only device on a bus.
///
/// Remembers the ROM id of the last successful discovery; failed
/// discoveries keep the previous one.
pub struct Ds2431<B: OneWire> {
	bus: B,
	rom: Option<RomId>,
}

impl<B: OneWire> Ds2431<B> {
	pub fn new(bus: B) -> Self {
		Ds2431 {
			bus,
			rom: None,
		}
	}

	/// Skip discovery for a device with known ROM id
	pub fn with_rom(bus: B, rom: RomId) -> Self {
		Ds2431 {
			bus,
			rom: Some(rom),
		}
	}

	pub fn rom_id(&self) -> Option<RomId> {
		self.rom
	}

	pub fn bus(&mut self) -> &mut B {
		&mut self.bus
	}

	pub fn discover(&mut self) -> Result<RomId, Error> {
		let rom = search_single(&mut self.bus, FAMILY_CODE)?;
		self.rom = Some(rom);
		Ok(rom)
	}

	pub fn discover_device(&mut self) -> bool {
		match self.discover() {
			Ok(_) => true,
			Err(e) => {
				warn!("DS2431 discovery failed: {}", e);
				false
			},
		}
	}

	// addressing without prior discovery targets the all-zero id
	fn target(&self) -> RomId {
		match self.rom {
			Some(rom) => rom,
			None => {
				warn!("DS2431 used without discovery, addressing {}", RomId::default());
				RomId::default()
			},
		}
	}

	pub fn read_byte_at(&mut self, row: u8) -> Result<u8, Error> {
		let rom = self.target();
		super::read(&mut self.bus, &rom, row)
	}

	pub fn read_row_at(&mut self, row: u8) -> Result<[u8; ROW_SIZE], Error> {
		let rom = self.target();
		super::read_row(&mut self.bus, &rom, row)
	}

	pub fn write_row(&mut self, payload: &[u8; ROW_SIZE], row: u8) -> Result<(), Error> {
		let rom = self.target();
		super::write(&mut self.bus, &rom, payload, row)
	}

	pub fn write_row_at(&mut self, payload: &[u8; ROW_SIZE], row: u8) -> bool {
		match self.write_row(payload, row) {
			Ok(()) => true,
			Err(e) => {
				warn!("DS2431 write of row {} failed: {}", row, e);
				false
			},
		}
	}

	/// Whole data memory, row by row
	pub fn dump(&mut self) -> Result<Vec<[u8; ROW_SIZE]>, Error> {
		(0..ROW_COUNT).map(|row| self.read_row_at(row)).collect()
	}
}
