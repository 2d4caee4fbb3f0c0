use std::collections::VecDeque;
use std::time::Instant;

const SAMPLE_COUNT: usize = 60;

/// Rolling tick-rate estimate over the last few ticks.
pub struct TickStats {
    tick_times: VecDeque<Instant>,
    tick_rate: f32,
    ticks: u64,
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TickStats {
    pub fn new() -> Self {
        Self {
            tick_times: VecDeque::with_capacity(SAMPLE_COUNT),
            tick_rate: 0.0,
            ticks: 0,
        }
    }

    pub fn record_tick(&mut self) {
        self.record_tick_at(Instant::now());
    }

    fn record_tick_at(&mut self, now: Instant) {
        self.ticks += 1;

        if self.tick_times.len() >= SAMPLE_COUNT {
            self.tick_times.pop_front();
        }
        self.tick_times.push_back(now);

        if let Some(oldest) = self.tick_times.front() {
            let elapsed = now.duration_since(*oldest).as_secs_f32();
            if elapsed > 0.0 {
                self.tick_rate = (self.tick_times.len() - 1) as f32 / elapsed;
            }
        }
    }

    pub fn tick_rate(&self) -> f32 {
        self.tick_rate
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
