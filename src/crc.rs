//! Dallas/Maxim checksums, computed bitwise (no lookup tables).
//!
//! Both are the LSB-first ("reflected") realisations with an initial value
//! of zero:
//! - CRC-8: x^8 + x^5 + x^4 + 1 (reflected polynomial 0x8C), protects ROM ids
//! - CRC-16: x^16 + x^15 + x^2 + 1 (reflected polynomial 0xA001), protects
//!   scratchpad traffic; devices send it inverted, low byte first.

const CRC8_POLY: u8 = 0x8C;
const CRC16_POLY: u16 = 0xA001;

pub fn crc8(data: &[u8]) -> u8 {
	let mut crc = 0u8;
	for &byte in data {
		crc ^= byte;
		for _ in 0..8 {
			if 0 != crc & 0x01 {
				crc = (crc >> 1) ^ CRC8_POLY;
			} else {
				crc >>= 1;
			}
		}
	}
	crc
}

pub fn crc16(data: &[u8]) -> u16 {
	let mut crc = 0u16;
	for &byte in data {
		crc ^= byte as u16;
		for _ in 0..8 {
			if 0 != crc & 0x0001 {
				crc = (crc >> 1) ^ CRC16_POLY;
			} else {
				crc >>= 1;
			}
		}
	}
	crc
}

/// The two bytes a device sends after `data`: inverted CRC-16, low byte first
pub fn inverted_crc16_bytes(data: &[u8]) -> [u8; 2] {
	let inverted = !crc16(data);
	[inverted as u8, (inverted >> 8) as u8]
}

/// Reassemble the CRC-16 from the (inverted) bytes a device sent
pub fn crc16_from_inverted(received: [u8; 2]) -> u16 {
	!((received[0] as u16) | (received[1] as u16) << 8)
}

pub fn check_inverted_crc16(data: &[u8], received: [u8; 2]) -> bool {
	inverted_crc16_bytes(data) == received
}
