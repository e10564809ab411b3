use crate::register::{Register, RegisterFile};

/// Payload handed to the host when a script fires. The host may rewrite any
/// field; the values are copied back into `EvA`..`EvF` before execution resumes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FireEvent {
	pub a: f64,
	pub b: f64,
	pub c: f64,
	pub d: f64,
	pub e: f64,
	pub f: f64,
}

impl FireEvent {
	pub fn from_registers(registers: &RegisterFile) -> Self {
		let [a, b, c, d, e, f] = Register::EVENTS.map(|r| registers.get(r));
		Self { a, b, c, d, e, f }
	}

	pub fn store(&self, registers: &mut RegisterFile) {
		let values = [self.a, self.b, self.c, self.d, self.e, self.f];
		for (register, value) in Register::EVENTS.iter().zip(values) {
			registers.set(*register, value);
		}
	}

	pub fn zero_all(&mut self) {
		*self = Self::default();
	}
}

/// Callbacks a runtime makes into whatever embeds it.
///
/// Every method has a no-op default, so `()` can stand in when nothing listens.
pub trait Host {
	/// A `fire` instruction ran with a nonzero trigger.
	fn fire(&mut self, _script: &str, _event: &mut FireEvent) {}

	/// An output tap (`pop out`, `out r`, `out c`) produced `value`.
	fn sink(&mut self, _script: &str, _value: f64) {}

	/// The script finished a tick without faulting.
	fn tick_completed(&mut self, _script: &str) {}
}

impl Host for () {}
