use std::fmt;
use std::fs;
use std::io::{
	self,
	Write,
};
use std::os::unix::fs::FileExt;
use std::path::{
	Path,
	PathBuf,
};
use std::str;

use crate::onewire::Hardware;

const GPIO_ROOT: &str = "/sys/class/gpio";

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct GpioLine(pub u32);

impl GpioLine {
	fn line_file(&self, root: &Path, name: &str) -> PathBuf {
		root.join(format!("gpio{}", self.0)).join(name)
	}

	fn write_control(&self, root: &Path, name: &str) -> crate::AResult<()> {
		fs::OpenOptions::new().write(true).open(root.join(name))?
			.write_all(self.0.to_string().as_bytes())?;
		Ok(())
	}

	fn is_exported_in(&self, root: &Path) -> bool {
		root.join(format!("gpio{}", self.0)).exists()
	}
}

impl fmt::Display for GpioLine {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl str::FromStr for GpioLine {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		// plain number or "gpioN"
		let num = if s.starts_with("gpio") { &s[4..] } else { s };
		ensure!(!num.is_empty() && num.bytes().all(|b| b.is_ascii_digit()), "invalid GPIO line: {:?}", s);
		let line = with_context!(("invalid GPIO line: {}", s),
			Ok(num.parse::<u32>()?)
		)?;
		Ok(GpioLine(line))
	}
}

/// Exports a line unless it already is; unexports it again on drop only in
/// the first case.
#[derive(Debug)]
struct ScopedExport {
	root: PathBuf,
	line: Option<GpioLine>, // is none if the line was exported before
}

impl ScopedExport {
	fn new(root: &Path, line: GpioLine) -> crate::AResult<Self> {
		if line.is_exported_in(root) {
			return Ok(ScopedExport { root: root.to_path_buf(), line: None });
		}
		with_context!(("GPIO {}: export", line), line.write_control(root, "export"))?;
		Ok(ScopedExport { root: root.to_path_buf(), line: Some(line) })
	}
}

impl Drop for ScopedExport {
	fn drop(&mut self) {
		if let Some(line) = self.line.take() {
			if let Err(e) = line.write_control(&self.root, "unexport") {
				error!("GPIO {}: Failed to unexport temporarily exported line: {}", line, e);
			}
		}
	}
}

/// Open-drain emulation on a sysfs GPIO: releasing switches the pin to
/// input, driving low switches it to an output at level 0.
pub struct SysfsLine {
	line: GpioLine,
	direction: fs::File,
	value: fs::File,
	released: bool,
	// dropped last: files are closed before unexporting
	_export: ScopedExport,
}

impl SysfsLine {
	pub fn open(line: GpioLine) -> crate::AResult<Self> {
		Self::open_in(Path::new(GPIO_ROOT), line)
	}

	fn open_in(root: &Path, line: GpioLine) -> crate::AResult<Self> {
		let export = ScopedExport::new(root, line)?;

		let open = |name: &str, writable: bool| -> crate::AResult<fs::File> {
			with_context!(("GPIO {}: open {}", line, name), {
				Ok(fs::OpenOptions::new().read(true).write(writable).open(line.line_file(root, name))?)
			})
		};

		let mut result = SysfsLine {
			line,
			direction: open("direction", true)?,
			value: open("value", false)?,
			released: false,
			_export: export,
		};
		result.release()?;
		Ok(result)
	}

	pub fn line(&self) -> GpioLine {
		self.line
	}

	fn write_direction(&self, direction: &[u8]) -> io::Result<()> {
		let l = self.direction.write_at(direction, 0)?;
		if l != direction.len() {
			Err(io::Error::new(io::ErrorKind::Other, "failed to write whole direction"))
		} else {
			Ok(())
		}
	}

	fn release(&mut self) -> crate::AResult<()> {
		let line = self.line;
		with_context!(("GPIO {}: release line", line), {
			self.write_direction(b"in")?;
			self.released = true;
			Ok(())
		})
	}

	fn drive_low(&mut self) -> crate::AResult<()> {
		let line = self.line;
		with_context!(("GPIO {}: drive line low", line), {
			// "low" configures the output and its level in one step
			self.write_direction(b"low")?;
			self.released = false;
			Ok(())
		})
	}

	fn sample(&self) -> crate::AResult<bool> {
		let mut buf = [0u8; 2];
		let l = self.value.read_at(&mut buf, 0)
			.map_err(|e| format_err!("GPIO {}: read value: {}", self.line, e))?;
		ensure!(l >= 1, "GPIO {}: empty value", self.line);
		match buf[0] {
			b'0' => Ok(false),
			b'1' => Ok(true),
			v => bail!("GPIO {}: invalid value {:?}", self.line, v as char),
		}
	}
}

impl Hardware for SysfsLine {
	fn set_line(&mut self, level: bool) {
		if level == self.released {
			return;
		}
		let res = if level { self.release() } else { self.drive_low() };
		if let Err(e) = res {
			// the bus primitives have no error path; a dead GPIO shows up as an
			// idle bus (no presence, reads of 0xff)
			error!("{}", e);
		}
	}

	fn read_line(&mut self) -> bool {
		match self.sample() {
			Ok(level) => level,
			Err(e) => {
				error!("{}", e);
				true
			},
		}
	}
}

impl Drop for SysfsLine {
	fn drop(&mut self) {
		if let Err(e) = self.release() {
			error!("{}", e);
		}
	}
}
