#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate mpboard_eeprom;
use mpboard_eeprom::*;

use std::process::exit;

use mpboard_eeprom::ds2431::{
	Ds2431,
	ROW_SIZE,
};
use mpboard_eeprom::gpio::{
	GpioLine,
	RealtimeGuard,
	SysfsLine,
};

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

struct HexBytes(Vec<u8>);

impl std::str::FromStr for HexBytes {
	type Err = failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		ensure!(s.bytes().all(|b| b.is_ascii_hexdigit()), "invalid hex string: {:?}", s);
		ensure!(0 == s.len() % 2, "hex string with odd number of digits: {:?}", s);
		let bytes = (0..s.len()).step_by(2)
			.map(|i| u8::from_str_radix(&s[i..i + 2], 16))
			.collect::<Result<Vec<u8>, _>>()?;
		Ok(HexBytes(bytes))
	}
}

fn hex(data: &[u8]) -> String {
	data.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}

fn open_device(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<Ds2431<SysfsLine>> {
	let line: GpioLine = get_param(sub_m, "GPIO")?;
	let bus = SysfsLine::open(line)?;

	if matches.is_present("rom") {
		let rom: RomId = get_param(matches, "rom")?;
		debug!("GPIO {}: using DS2431 {}", line, rom);
		return Ok(Ds2431::with_rom(bus, rom));
	}

	let mut ee = Ds2431::new(bus);
	let rom = ee.discover().map_err(|e| format_err!("GPIO {}: discovery: {}", line, e))?;
	info!("GPIO {}: found DS2431 {}", line, rom);
	Ok(ee)
}

fn discover(sub_m: &clap::ArgMatches) -> AResult<()> {
	let line: GpioLine = get_param(sub_m, "GPIO")?;
	let mut ee = Ds2431::new(SysfsLine::open(line)?);
	let rom = ee.discover().map_err(|e| format_err!("GPIO {}: discovery: {}", line, e))?;
	println!("{}", rom);

	Ok(())
}

fn read(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let row: u8 = get_param(sub_m, "ROW")?;
	let mut ee = open_device(matches, sub_m)?;
	println!("{:02x}", ee.read_byte_at(row)?);

	Ok(())
}

fn dump(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let mut ee = open_device(matches, sub_m)?;
	for (row, data) in ee.dump()?.iter().enumerate() {
		println!("@{:02x}: {}", row * ROW_SIZE, hex(data));
	}

	Ok(())
}

fn write(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let row: u8 = get_param(sub_m, "ROW")?;
	let data: HexBytes = get_param(sub_m, "HEX")?;
	let retries: u32 = get_param(sub_m, "retries")?;
	ensure!(data.0.len() == ROW_SIZE, "need exactly {} bytes to write a row, got {}", ROW_SIZE, data.0.len());
	let mut payload = [0u8; ROW_SIZE];
	payload.copy_from_slice(&data.0);

	let mut ee = open_device(matches, sub_m)?;
	for attempt in 0..=retries {
		match ee.write_row(&payload, row) {
			Ok(()) => {
				info!("Wrote row {}: {}", row, hex(&payload));
				return Ok(());
			},
			Err(e) => warn!("Writing row {} failed (attempt {} of {}): {}", row, attempt + 1, retries + 1, e),
		}
	}
	bail!("Failed to write row {}", row);
}

fn crc(sub_m: &clap::ArgMatches) -> AResult<()> {
	let data: HexBytes = get_param(sub_m, "HEX")?;
	let crc16 = crc::crc16(&data.0);
	println!("crc8:  {:02x}", crc::crc8(&data.0));
	println!("crc16: {:04x} (sent inverted: {})", crc16, hex(&crc::inverted_crc16_bytes(&data.0)));

	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg realtime: --realtime "run with realtime priority and locked memory")
		(@arg rom: --rom +takes_value "ROM id of the DS2431 (ff-ssssssssssss), skips discovery")
		(@subcommand discover =>
			(about: "search the single DS2431 on the bus and print its ROM id")
			(@arg GPIO: +required "GPIO line of the bus (N or gpioN)")
		)
		(@subcommand read =>
			(about: "print first byte of a memory row")
			(@arg GPIO: +required "GPIO line of the bus (N or gpioN)")
			(@arg ROW: +required "row number (0-15)")
		)
		(@subcommand dump =>
			(about: "print all memory rows")
			(@arg GPIO: +required "GPIO line of the bus (N or gpioN)")
		)
		(@subcommand write =>
			(about: "write 8 bytes to a memory row")
			(@arg retries: --retries +takes_value default_value("0") "repeat failed writes up to N times")
			(@arg GPIO: +required "GPIO line of the bus (N or gpioN)")
			(@arg ROW: +required "row number (0-15)")
			(@arg HEX: +required "data as 16 hex digits")
		)
		(@subcommand crc =>
			(about: "show 1-Wire CRCs of hex data")
			(@arg HEX: +required "data as hex digits")
		)
	).get_matches();

	// bit slots are timed in userspace; keep the guard for the whole command
	let _rt = if matches.is_present("realtime") {
		Some(RealtimeGuard::acquire())
	} else {
		None
	};

	match matches.subcommand() {
		("discover", Some(sub_m)) => {
			discover(sub_m)
		}
		("read", Some(sub_m)) => {
			read(&matches, sub_m)
		}
		("dump", Some(sub_m)) => {
			dump(&matches, sub_m)
		}
		("write", Some(sub_m)) => {
			write(&matches, sub_m)
		}
		("crc", Some(sub_m)) => {
			crc(sub_m)
		}
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
