//! Bit-level DS2431 simulator for tests.

use std::collections::VecDeque;

use crate::Error;
use crate::crc::inverted_crc16_bytes;
use crate::ds2431::consts::*;
use crate::ds2431::ROW_SIZE;
use crate::onewire::{
	OneWire,
	RomId,
	rom_commands::{
		MATCH_ROM,
		SEARCH_ROM,
	},
};

const MEMORY_SIZE: usize = 128;

enum State {
	// not listening until the next reset
	Idle,
	RomCommand,
	MatchRom(Vec<u8>),
	// step 0: send ROM bit, 1: send complement, 2: receive direction
	Search { bit: u8, step: u8 },
	Function,
	WriteScratchpad(Vec<u8>),
	CopyScratchpad(Vec<u8>),
	ReadMemory(Vec<u8>),
}

pub struct SimBus {
	present: bool,
	rom: RomId,
	// further devices taking part in Search ROM only
	search_roms: Vec<RomId>,
	participating: Vec<bool>,

	memory: [u8; MEMORY_SIZE],
	scratchpad: [u8; ROW_SIZE],
	target: u16,
	status: u8,

	state: State,
	rx: u8,
	rx_bits: u8,
	tx: VecDeque<bool>,
	selected: bool,

	transactions: Vec<Vec<u8>>,
	bits_read_per_transaction: Vec<usize>,
	commands: Vec<u8>,
	bits_read: usize,
	waited_ms: u32,

	// fault injection
	pub stuck_low: bool,
	pub search_dropout_at: Option<u8>,
	pub status_override: Option<u8>,
	pub corrupt_write_crc: bool,
	pub corrupt_read_crc: bool,
	pub commit_response: Option<u8>,
}

impl SimBus {
	fn new(present: bool, rom: RomId) -> Self {
		SimBus {
			present,
			rom,
			search_roms: Vec::new(),
			participating: Vec::new(),
			memory: [0xff; MEMORY_SIZE],
			scratchpad: [0xff; ROW_SIZE],
			target: 0,
			status: 0,
			state: State::Idle,
			rx: 0,
			rx_bits: 0,
			tx: VecDeque::new(),
			selected: false,
			transactions: Vec::new(),
			bits_read_per_transaction: Vec::new(),
			commands: Vec::new(),
			bits_read: 0,
			waited_ms: 0,
			stuck_low: false,
			search_dropout_at: None,
			status_override: None,
			corrupt_write_crc: false,
			corrupt_read_crc: false,
			commit_response: None,
		}
	}

	pub fn empty() -> Self {
		SimBus::new(false, RomId::default())
	}

	pub fn with_device(rom: RomId) -> Self {
		SimBus::new(true, rom)
	}

	pub fn add_search_device(&mut self, rom: RomId) {
		self.search_roms.push(rom);
	}

	/// bytes written by the master, one entry per reset
	pub fn transactions(&self) -> Vec<Vec<u8>> {
		self.transactions.clone()
	}

	pub fn bits_read(&self) -> usize {
		self.bits_read
	}

	pub fn bytes_read_in(&self, transaction: usize) -> usize {
		self.bits_read_per_transaction[transaction] / 8
	}

	pub fn received_command(&self, command: u8) -> bool {
		self.commands.contains(&command)
	}

	pub fn program_wait_ms(&self) -> u32 {
		self.waited_ms
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory[..]
	}

	pub fn selected(&self) -> bool {
		self.selected
	}

	fn send_byte(&mut self, byte: u8) {
		for bit in 0..8 {
			self.tx.push_back(0 != byte & (1 << bit));
		}
	}

	fn send(&mut self, data: &[u8]) {
		for &b in data {
			self.send_byte(b);
		}
	}

	fn search_roms(&self) -> Vec<RomId> {
		let mut roms = vec![self.rom];
		roms.extend_from_slice(&self.search_roms);
		roms
	}

	fn rom_bit(rom: &RomId, bit: u8) -> bool {
		0 != rom.0[(bit / 8) as usize] & (1 << (bit % 8))
	}

	// wired-AND of all participating devices
	fn search_send(&mut self, bit: u8, step: u8) -> bool {
		self.state = State::Search { bit, step: step + 1 };
		if self.search_dropout_at == Some(bit) {
			return true;
		}
		let mut id = true;
		let mut cmp = true;
		for (rom, _) in self.search_roms().iter().zip(self.participating.iter()).filter(|&(_, p)| *p) {
			let b = Self::rom_bit(rom, bit);
			id &= b;
			cmp &= !b;
		}
		if 0 == step { id } else { cmp }
	}

	fn search_direction(&mut self, bit: u8, direction: bool) {
		let roms = self.search_roms();
		for (rom, p) in roms.iter().zip(self.participating.iter_mut()) {
			if Self::rom_bit(rom, bit) != direction {
				*p = false;
			}
		}
		if bit == 63 {
			self.selected = self.participating[0];
			self.state = if self.selected { State::Function } else { State::Idle };
		} else {
			self.state = State::Search { bit: bit + 1, step: 0 };
		}
	}

	fn stage(&mut self, data: &[u8]) {
		self.target = data[0] as u16 | (data[1] as u16) << 8;
		self.scratchpad.copy_from_slice(&data[2..]);
		// ending offset of a full aligned row; partial and copied flags clear
		self.status = 0x07;

		let mut frame = vec![WRITE_SCRATCHPAD];
		frame.extend_from_slice(data);
		let mut crc = inverted_crc16_bytes(&frame);
		if self.corrupt_write_crc {
			crc[0] ^= 0xff;
		}
		self.send(&crc);
	}

	fn send_scratchpad(&mut self) {
		let status = self.status_override.unwrap_or(self.status);
		let mut frame = vec![READ_SCRATCHPAD, self.target as u8, (self.target >> 8) as u8, status];
		frame.extend_from_slice(&self.scratchpad);
		let mut crc = inverted_crc16_bytes(&frame);
		if self.corrupt_read_crc {
			crc[1] ^= 0xff;
		}
		self.send(&frame[1..]);
		self.send(&crc);
	}

	fn copy(&mut self, auth: &[u8]) {
		if auth[..] != [self.target as u8, (self.target >> 8) as u8, self.status] {
			return;
		}
		if let Some(response) = self.commit_response {
			self.send_byte(response);
			return;
		}
		let start = self.target as usize;
		self.memory[start..start + ROW_SIZE].copy_from_slice(&self.scratchpad);
		self.status |= 0x80;
		self.send_byte(COPY_SUCCESS);
	}

	fn read_memory(&mut self, address: &[u8]) {
		let start = (address[0] as usize | (address[1] as usize) << 8).min(MEMORY_SIZE);
		let data = self.memory[start..].to_vec();
		self.send(&data);
	}

	fn receive(&mut self, byte: u8) {
		let state = std::mem::replace(&mut self.state, State::Idle);
		self.state = match state {
			State::Idle | State::Search { .. } => State::Idle,
			State::RomCommand => match byte {
				SEARCH_ROM => {
					self.participating = vec![true; 1 + self.search_roms.len()];
					State::Search { bit: 0, step: 0 }
				},
				MATCH_ROM => State::MatchRom(Vec::new()),
				_ => State::Idle,
			},
			State::MatchRom(mut rom) => {
				rom.push(byte);
				if rom.len() < 8 {
					State::MatchRom(rom)
				} else if rom[..] == self.rom.0[..] {
					self.selected = true;
					State::Function
				} else {
					State::Idle
				}
			},
			State::Function => {
				self.commands.push(byte);
				match byte {
					WRITE_SCRATCHPAD => State::WriteScratchpad(Vec::new()),
					READ_SCRATCHPAD => {
						self.send_scratchpad();
						State::Idle
					},
					COPY_SCRATCHPAD => State::CopyScratchpad(Vec::new()),
					READ_MEMORY => State::ReadMemory(Vec::new()),
					_ => State::Idle,
				}
			},
			State::WriteScratchpad(mut data) => {
				data.push(byte);
				if data.len() < 2 + ROW_SIZE {
					State::WriteScratchpad(data)
				} else {
					self.stage(&data);
					State::Idle
				}
			},
			State::CopyScratchpad(mut auth) => {
				auth.push(byte);
				if auth.len() < 3 {
					State::CopyScratchpad(auth)
				} else {
					self.copy(&auth);
					State::Idle
				}
			},
			State::ReadMemory(mut address) => {
				address.push(byte);
				if address.len() < 2 {
					State::ReadMemory(address)
				} else {
					self.read_memory(&address);
					State::Idle
				}
			},
		};
	}
}

impl OneWire for SimBus {
	fn reset(&mut self) -> Result<bool, Error> {
		if self.stuck_low {
			return Err(Error::BusTimeout);
		}
		self.transactions.push(Vec::new());
		self.bits_read_per_transaction.push(0);
		self.tx.clear();
		self.rx = 0;
		self.rx_bits = 0;
		self.selected = false;
		self.state = if self.present { State::RomCommand } else { State::Idle };
		Ok(self.present)
	}

	fn write_bit(&mut self, bit: bool) {
		match self.state {
			State::Search { bit: b, step: 2 } => return self.search_direction(b, bit),
			State::Search { .. } => {
				self.state = State::Idle;
				return;
			},
			_ => (),
		}

		if bit {
			self.rx |= 1 << self.rx_bits;
		}
		self.rx_bits += 1;
		if 8 == self.rx_bits {
			let byte = self.rx;
			self.rx = 0;
			self.rx_bits = 0;
			if let Some(t) = self.transactions.last_mut() {
				t.push(byte);
			}
			self.receive(byte);
		}
	}

	fn read_bit(&mut self) -> bool {
		self.bits_read += 1;
		if let Some(n) = self.bits_read_per_transaction.last_mut() {
			*n += 1;
		}
		if let State::Search { bit, step } = self.state {
			if step < 2 {
				return self.search_send(bit, step);
			}
		}
		self.tx.pop_front().unwrap_or(true)
	}

	fn wait_ms(&mut self, ms: u32) {
		self.waited_ms += ms;
	}
}
