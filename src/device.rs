use std::{collections::HashMap, path::Path, sync::Arc};

use crate::{
	bytecode::Bytecode,
	config::Config,
	error::{device::*, runtime::RuntimeError},
	fileio,
	runtime::{Host, Runtime},
	stack::Stack,
	Compiler,
};

/// What one device tick did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
	/// Runtimes that completed the tick.
	pub updated: usize,
	/// Slot id and fault of every runtime that did not.
	pub faults: Vec<(usize, RuntimeError)>,
}

/// Schedules runtimes against one shared operand stack and tick counter.
#[derive(Debug)]
pub struct Device {
	config: Config,
	cache: HashMap<String, Arc<Bytecode>>,
	stack: Stack,
	slots: Vec<Option<Runtime>>,
	ticks: u64,
	pub enabled: bool,
}

impl Default for Device {
	fn default() -> Self {
		Self::new(Config::default())
	}
}

impl Device {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			cache: HashMap::new(),
			stack: Stack::new(config.stack_size),
			slots: vec![],
			ticks: 0,
			enabled: true,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Load a script from `path` and cache it under `name`. Returns `false`
	/// without touching the file if `name` is already cached.
	pub fn load(&mut self, name: &str, path: impl AsRef<Path>) -> DeviceResult<bool> {
		if self.is_cached(name) {
			return Ok(false);
		}
		let compiler = Compiler::new().with_timer_count(self.config.timer_count);
		let bytecode = fileio::load_script_with(path, compiler)?;
		self.insert(name, bytecode);
		Ok(true)
	}

	/// Cache `bytecode` under `name`, replacing any previous entry. Running
	/// runtimes keep the script they were spawned with.
	pub fn insert(&mut self, name: &str, bytecode: Bytecode) {
		tracing::debug!(script = name, bytes = bytecode.code().len(), "cached script");
		self.cache.insert(name.to_string(), Arc::new(bytecode));
	}

	pub fn is_cached(&self, name: &str) -> bool {
		self.cache.contains_key(name)
	}

	pub fn get(&self, name: &str) -> Option<&Arc<Bytecode>> {
		self.cache.get(name)
	}

	/// Create a runtime for a cached script in the first free slot.
	pub fn spawn(&mut self, name: &str, period: u32) -> DeviceResult<usize> {
		let bytecode = self
			.get(name)
			.cloned()
			.ok_or_else(|| DeviceError::NotCached(name.to_string()))?;
		let runtime = Runtime::new(name, bytecode, period).with_timers(self.config.timer_count);

		let id = match self.slots.iter().position(Option::is_none) {
			Some(id) => id,
			None if self.slots.len() < self.config.max_objects => {
				self.slots.push(None);
				self.slots.len() - 1
			}
			None => return Err(DeviceError::Full(self.config.max_objects)),
		};
		self.slots[id] = Some(runtime);
		Ok(id)
	}

	pub fn remove(&mut self, id: usize) -> Option<Runtime> {
		self.slots.get_mut(id)?.take()
	}

	pub fn runtime(&self, id: usize) -> Option<&Runtime> {
		self.slots.get(id)?.as_ref()
	}

	pub fn runtime_mut(&mut self, id: usize) -> Option<&mut Runtime> {
		self.slots.get_mut(id)?.as_mut()
	}

	/// Number of live runtimes.
	pub fn len(&self) -> usize {
		self.slots.iter().flatten().count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Drop every runtime. Cached scripts stay.
	pub fn clear(&mut self) {
		self.slots.clear();
		self.stack.clear();
	}

	pub fn ticks(&self) -> u64 {
		self.ticks
	}

	/// Values left on the shared stack by the last tick.
	pub fn stack_len(&self) -> usize {
		self.stack.len()
	}

	/// Run every enabled runtime once, in slot order, then advance the tick counter.
	pub fn iterate(&mut self, host: &mut dyn Host) -> TickReport {
		let mut report = TickReport::default();
		if !self.enabled {
			return report;
		}
		let tick = self.ticks;
		for (id, slot) in self.slots.iter_mut().enumerate() {
			let runtime = match slot {
				Some(runtime) if runtime.enabled => runtime,
				_ => continue,
			};
			match runtime.iterate(&mut self.stack, tick, host) {
				Ok(_) => report.updated += 1,
				Err(e) => {
					tracing::warn!(id, tick, "{}", e);
					self.stack.clear();
					report.faults.push((id, e));
				}
			}
		}
		self.ticks += 1;
		report
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::runtime::{RuntimeErrorKind, StackError};

	mod util {
		use super::*;

		pub fn device(scripts: &[(&str, &str)]) -> Device {
			let mut device = Device::default();
			for (name, source) in scripts {
				device.insert(name, Compiler::new().compile(source).unwrap());
			}
			device
		}
	}

	use util::*;

	#[test]
	fn spawn_and_tick() {
		let mut device = device(&[("ramp", "push x"), ("two", "push 2")]);
		let ramp = device.spawn("ramp", 4).unwrap();
		let two = device.spawn("two", 1).unwrap();
		assert_eq!((ramp, two), (0, 1));
		assert_eq!(device.len(), 2);

		for _ in 0..3 {
			let report = device.iterate(&mut ());
			assert_eq!(report.updated, 2);
			assert!(report.faults.is_empty());
		}
		assert_eq!(device.ticks(), 3);
		assert_eq!(device.runtime(ramp).unwrap().output(), 0.5);
		assert_eq!(device.runtime(two).unwrap().output(), 2.0);
		assert_eq!(device.stack_len(), 0);
	}

	#[test]
	fn fault_is_isolated() {
		let mut device = device(&[("leaky", "push 1\npush 2\npush 3\nadd"), ("empty", "add"), ("ok", "push 1")]);
		let leaky = device.spawn("leaky", 1).unwrap();
		let empty = device.spawn("empty", 1).unwrap();
		let ok = device.spawn("ok", 1).unwrap();

		let report = device.iterate(&mut ());
		assert_eq!(report.updated, 2);
		assert_eq!(report.faults.len(), 1);
		let (id, e) = &report.faults[0];
		assert_eq!(*id, empty);
		assert_eq!(e.script, "empty");
		assert_eq!(e.kind, RuntimeErrorKind::Stack(StackError::Underflow));
		assert_eq!(device.runtime(leaky).unwrap().output(), 5.0);
		assert_eq!(device.runtime(ok).unwrap().output(), 1.0);
		assert_eq!(device.stack_len(), 0);
	}

	#[test]
	fn disabled() {
		let mut device = device(&[("one", "push 1")]);
		let id = device.spawn("one", 1).unwrap();
		device.runtime_mut(id).unwrap().enabled = false;
		assert_eq!(device.iterate(&mut ()).updated, 0);
		assert_eq!(device.ticks(), 1);

		device.runtime_mut(id).unwrap().enabled = true;
		device.enabled = false;
		assert_eq!(device.iterate(&mut ()), TickReport::default());
		assert_eq!(device.ticks(), 1);
	}

	#[test]
	fn slots() {
		let mut device = Device::new(Config {
			max_objects: 2,
			..Config::default()
		});
		device.insert("one", Compiler::new().compile("push 1").unwrap());
		assert!(matches!(device.spawn("missing", 1), Err(DeviceError::NotCached(_))));
		assert_eq!(device.spawn("one", 1).unwrap(), 0);
		assert_eq!(device.spawn("one", 1).unwrap(), 1);
		assert!(matches!(device.spawn("one", 1), Err(DeviceError::Full(2))));

		assert!(device.remove(0).is_some());
		assert!(device.remove(0).is_none());
		assert!(device.runtime(0).is_none());
		assert_eq!(device.spawn("one", 1).unwrap(), 0);

		device.clear();
		assert!(device.is_empty());
		assert!(device.is_cached("one"));
	}

	#[test]
	fn load_caches_once() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("wave.cog");
		std::fs::write(&path, "push x").unwrap();

		let mut device = Device::default();
		assert!(device.load("wave", &path).unwrap());
		std::fs::remove_file(&path).unwrap();
		assert!(!device.load("wave", &path).unwrap());
		assert!(matches!(device.load("other", &path), Err(DeviceError::Load(_))));
		assert_eq!(device.get("wave").unwrap().code().len(), 1);
	}

	#[test]
	fn spawned_runtimes_use_configured_timers() {
		let mut device = Device::new(Config {
			timer_count: 2,
			..Config::default()
		});
		device.insert("t", Compiler::new().compile("tstat t1").unwrap());
		let id = device.spawn("t", 1).unwrap();
		assert_eq!(device.runtime(id).unwrap().timers().len(), 2);
		assert_eq!(device.iterate(&mut ()).updated, 1);
		assert_eq!(device.runtime(id).unwrap().output(), -1.0);
	}
}
