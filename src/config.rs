use serde::{Deserialize, Serialize};

/// Depth of the shared operand stack.
pub const STACK_SIZE: usize = 128;
/// Timers per runtime.
pub const TIMER_COUNT: usize = 8;
/// Runtimes a single device schedules.
pub const MAX_OBJECTS: usize = 64;

/// Limits applied by a [`Device`](crate::Device) and the runtimes it spawns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stack_size: usize,
    pub timer_count: usize,
    pub max_objects: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stack_size: STACK_SIZE,
            timer_count: TIMER_COUNT,
            max_objects: MAX_OBJECTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode() {
        let config = Config {
            max_objects: 4,
            ..Config::default()
        };
        let bytes = bincode::serialize(&config).unwrap();
        assert_eq!(bytes.len(), 3 * 8);
        assert_eq!(bincode::deserialize::<Config>(&bytes).unwrap(), config);
        assert_eq!(Config::default().stack_size, STACK_SIZE);
    }
}
