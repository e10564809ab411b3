/*
	# Bytecode Container
	Every field is little-endian with fixed-width integers, the layout bincode 1.x uses by default.

	| field        | type          |
	|--------------|---------------|
	| magic        | u32 (`CBCP`)  |
	| label count  | i32           |
	| labels       | i32 * count   |
	| code length  | i32           |
	| code         | u8 * length   |
*/

use std::{
	ffi::OsStr,
	fs::{self, File},
	io::{BufReader, BufWriter, Read, Write},
	path::Path,
};

use crate::{bytecode::Bytecode, error::fileio::*, Compiler};

pub const MAGIC: u32 = 0x5043_4243;
/// Extension of compiled scripts.
pub const EXTENSION: &str = "pcbf";

fn length(len: usize, what: &str) -> FileIOResult<i32> {
	i32::try_from(len)
		.map_err(|_| FileIOError::Encoding(format!("{} length {} does not fit the container", what, len)))
}

fn count<R: Read>(reader: &mut R, what: &'static str) -> FileIOResult<usize> {
	let len: i32 = bincode::deserialize_from(reader)?;
	usize::try_from(len).map_err(|_| FileIOError::NegativeLength(what))
}

pub fn write<W: Write>(bytecode: &Bytecode, mut writer: W) -> FileIOResult {
	bincode::serialize_into(&mut writer, &MAGIC)?;
	bincode::serialize_into(&mut writer, &length(bytecode.labels().len(), "label")?)?;
	for label in bytecode.labels() {
		bincode::serialize_into(&mut writer, label)?;
	}
	bincode::serialize_into(&mut writer, &length(bytecode.code().len(), "code")?)?;
	writer.write_all(bytecode.code())?;
	Ok(())
}

pub fn read<R: Read>(mut reader: R) -> FileIOResult<Bytecode> {
	let magic: u32 = bincode::deserialize_from(&mut reader)?;
	if magic != MAGIC {
		return Err(FileIOError::BadMagic(magic));
	}

	let label_count = count(&mut reader, "label")?;
	let mut labels = Vec::new();
	for _ in 0..label_count {
		labels.push(bincode::deserialize_from::<_, i32>(&mut reader)?);
	}

	let code_len = count(&mut reader, "code")?;
	let mut code = Vec::new();
	(&mut reader).take(code_len as u64).read_to_end(&mut code)?;
	if code.len() != code_len {
		return Err(FileIOError::Truncated);
	}
	Ok(Bytecode::new(code, labels))
}

pub fn to_bytes(bytecode: &Bytecode) -> FileIOResult<Vec<u8>> {
	let mut output = Vec::with_capacity(12 + bytecode.labels().len() * 4 + bytecode.code().len());
	write(bytecode, &mut output)?;
	Ok(output)
}

pub fn from_bytes(input: &[u8]) -> FileIOResult<Bytecode> {
	read(input)
}

pub fn save(bytecode: &Bytecode, path: impl AsRef<Path>) -> FileIOResult {
	let mut writer = BufWriter::new(File::create(path)?);
	write(bytecode, &mut writer)?;
	writer.flush()?;
	Ok(())
}

pub fn load(path: impl AsRef<Path>) -> FileIOResult<Bytecode> {
	read(BufReader::new(File::open(path)?))
}

/// Load a script by extension: `.pcbf` is read as bytecode, `.cog` and `.txt`
/// are compiled from source.
pub fn load_script(path: impl AsRef<Path>) -> FileIOResult<Bytecode> {
	load_script_with(path, Compiler::new())
}

pub fn load_script_with(path: impl AsRef<Path>, compiler: Compiler) -> FileIOResult<Bytecode> {
	let path = path.as_ref();
	let extension = path
		.extension()
		.and_then(OsStr::to_str)
		.map(str::to_ascii_lowercase)
		.unwrap_or_default();
	match extension.as_str() {
		EXTENSION => load(path),
		"cog" | "txt" => {
			let source = fs::read_to_string(path)?;
			let bytecode = compiler.compile(&source)?;
			tracing::debug!(path = %path.display(), bytes = bytecode.code().len(), "compiled script");
			Ok(bytecode)
		}
		_ => Err(FileIOError::UnsupportedFormat(path.display().to_string())),
	}
}
