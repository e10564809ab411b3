/// Ternary timer status as seen by bytecode.
#[repr(i8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerStatus {
    Inactive = -1,
    Running = 0,
    Expired = 1,
}

impl From<TimerStatus> for f64 {
    fn from(status: TimerStatus) -> f64 {
        status as i8 as f64
    }
}

/// A countdown timer counting ticks up towards its limit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timer {
    pub active: bool,
    pub elapsed: u32,
    pub limit: u32,
}

impl Timer {
    pub fn status(&self) -> TimerStatus {
        if !self.active {
            TimerStatus::Inactive
        } else if self.elapsed < self.limit {
            TimerStatus::Running
        } else {
            TimerStatus::Expired
        }
    }

    /// Clears elapsed ticks and deactivates. The limit is kept.
    pub fn reset(&mut self) {
        self.elapsed = 0;
        self.active = false;
    }

    fn advance(&mut self) {
        if self.active {
            self.elapsed = self.elapsed.saturating_add(1);
        }
    }
}

/// Fixed bank of independent timers owned by one runtime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimerBank {
    timers: Vec<Timer>,
}

impl TimerBank {
    pub fn new(count: usize) -> Self {
        Self {
            timers: vec![Timer::default(); count],
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Timer> {
        self.timers.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Timer> {
        self.timers.get_mut(index)
    }

    pub fn start(&mut self, index: usize) -> Option<()> {
        self.get_mut(index).map(|t| t.active = true)
    }

    pub fn stop(&mut self, index: usize) -> Option<()> {
        self.get_mut(index).map(|t| t.active = false)
    }

    pub fn set_limit(&mut self, index: usize, limit: u32) -> Option<()> {
        self.get_mut(index).map(|t| t.limit = limit)
    }

    pub fn reset(&mut self, index: usize) -> Option<()> {
        self.get_mut(index).map(Timer::reset)
    }

    pub fn status(&self, index: usize) -> Option<TimerStatus> {
        self.get(index).map(Timer::status)
    }

    pub fn elapsed(&self, index: usize) -> Option<u32> {
        self.get(index).map(|t| t.elapsed)
    }

    pub fn limit(&self, index: usize) -> Option<u32> {
        self.get(index).map(|t| t.limit)
    }

    /// Count one tick on every active timer.
    pub fn advance(&mut self) {
        self.timers.iter_mut().for_each(Timer::advance);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timer> {
        self.timers.iter()
    }
}
