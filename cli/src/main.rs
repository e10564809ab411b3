mod error;

use std::{fs::read_to_string, io::ErrorKind, path::Path, process::ExitCode, sync::Arc};

use colored::Colorize;
use error::*;
use pulse::{fileio, Bytecode, FileIOError, FireEvent, Host, Runtime, Stack};
use tracing_subscriber::EnvFilter;

/// Logs whatever the script hands back to its host.
struct Console;

impl Host for Console {
	fn fire(&mut self, script: &str, event: &mut FireEvent) {
		tracing::info!(script, ?event, "fire");
	}

	fn sink(&mut self, script: &str, value: f64) {
		tracing::info!(script, value, "out");
	}
}

fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(std::io::stderr)
		.init();

	match cli() {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			eprintln!("{} {}", "error:".red().bold(), e.to_string().red());
			ExitCode::FAILURE
		}
	}
}

fn cli() -> CLIResult {
	let mut args = std::env::args();
	args.next(); // Ignore program name
	let command = args.next().ok_or(CLIError::InsufficientArguments)?;
	let file = args.next().ok_or(CLIError::InsufficientArguments)?;
	match command.as_str() {
		"build" => build(&file),
		"run" => {
			let ticks = args.next().map(|s| number(&s)).transpose()?;
			let period = args.next().map(|s| number(&s)).transpose()?.unwrap_or(10);
			run(&file, u64::from(ticks.unwrap_or(period)), period)
		}
		"dump" => {
			print!("{}", load(&file)?);
			Ok(())
		}
		_ => Err(CLIError::UnknownArgument(command)),
	}
}

fn number(arg: &str) -> CLIResult<u32> {
	arg.parse().map_err(|_| CLIError::BadNumber(arg.to_string()))
}

fn load(file: &str) -> CLIResult<Bytecode> {
	fileio::load_script(file).map_err(|e| match e {
		FileIOError::Io(e) if e.kind() == ErrorKind::NotFound => CLIError::NotFound(file.to_string()),
		e => e.into(),
	})
}

fn build(file: &str) -> CLIResult {
	let source = match read_to_string(file) {
		Ok(s) => s,
		Err(e) if e.kind() == ErrorKind::NotFound => return Err(CLIError::NotFound(file.into())),
		Err(e) => return Err(e.into()),
	};
	let bytecode = pulse::compile(&source)?;
	let save_as = Path::new(file).with_extension(fileio::EXTENSION);
	fileio::save(&bytecode, &save_as)?;
	tracing::info!(
		bytes = bytecode.code().len(),
		labels = bytecode.labels().len(),
		"wrote {}",
		save_as.display()
	);
	Ok(())
}

fn run(file: &str, ticks: u64, period: u32) -> CLIResult {
	let bytecode = Arc::new(load(file)?);
	let name = Path::new(file)
		.file_stem()
		.map(|s| s.to_string_lossy().into_owned())
		.unwrap_or_else(|| file.to_string());
	let mut runtime = Runtime::new(name, bytecode, period);
	let mut stack = Stack::default();
	for tick in 0..ticks {
		let output = runtime.iterate(&mut stack, tick, &mut Console)?;
		println!("{} {}", tick, output);
	}
	Ok(())
}
