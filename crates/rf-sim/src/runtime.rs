//! Simulation clock: time value, step size, write schedule and time names.

use rf_core::SMALL;

use crate::error::{SimError, SimResult};

/// When solution fields are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteControl {
    /// Every `write_interval` time steps.
    #[default]
    TimeStep,
    /// Every `write_interval` of simulated time, at the step within half a
    /// step of each multiple.
    RunTime,
    /// Like `RunTime`, with the step size adjusted to land on write times.
    AdjustableRunTime,
}

/// Clock configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTimeConfig {
    pub start_time: f64,
    pub end_time: f64,
    pub delta_t: f64,
    pub write_control: WriteControl,
    /// Steps or seconds, depending on `write_control`.
    pub write_interval: f64,
    /// Adapt the step size to `max_co`.
    pub adjust_time_step: bool,
    pub max_co: f64,
    pub max_delta_t: f64,
}

impl Default for RunTimeConfig {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            end_time: 1.0,
            delta_t: 1e-3,
            write_control: WriteControl::TimeStep,
            write_interval: 100.0,
            adjust_time_step: false,
            max_co: 1.0,
            max_delta_t: f64::MAX,
        }
    }
}

impl RunTimeConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.start_time.is_finite() && self.end_time.is_finite()) {
            return Err(SimError::invalid("start and end time must be finite"));
        }
        if self.end_time < self.start_time {
            return Err(SimError::invalid(format!(
                "endTime {} before startTime {}",
                self.end_time, self.start_time
            )));
        }
        if !(self.delta_t.is_finite() && self.delta_t > 0.0) {
            return Err(SimError::invalid("deltaT must be positive"));
        }
        if !(self.write_interval.is_finite() && self.write_interval > 0.0) {
            return Err(SimError::invalid("writeInterval must be positive"));
        }
        if self.write_control == WriteControl::TimeStep && self.write_interval.fract() != 0.0 {
            return Err(SimError::invalid(
                "writeInterval must be a whole number of steps for timeStep control",
            ));
        }
        if self.adjust_time_step {
            if !(self.max_co.is_finite() && self.max_co > 0.0) {
                return Err(SimError::invalid("maxCo must be positive"));
            }
            if !(self.max_delta_t > 0.0) {
                return Err(SimError::invalid("maxDeltaT must be positive"));
            }
        }
        Ok(())
    }
}

/// Running clock of a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTime {
    config: RunTimeConfig,
    value: f64,
    delta_t: f64,
    /// Step size asked for before write-time adjustment.
    requested_delta_t: f64,
    delta_t0: f64,
    time_index: usize,
    output_time_index: usize,
    write_time: bool,
}

impl RunTime {
    pub fn new(config: RunTimeConfig) -> SimResult<Self> {
        config.validate()?;
        let mut rt = Self {
            value: config.start_time,
            delta_t: config.delta_t,
            requested_delta_t: config.delta_t,
            delta_t0: config.delta_t,
            time_index: 0,
            output_time_index: 0,
            write_time: false,
            config,
        };
        if rt.config.write_control == WriteControl::AdjustableRunTime {
            rt.adjust_delta_t();
        }
        Ok(rt)
    }

    pub fn config(&self) -> &RunTimeConfig {
        &self.config
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    /// Step size of the previous step.
    pub fn delta_t0(&self) -> f64 {
        self.delta_t0
    }

    pub fn time_index(&self) -> usize {
        self.time_index
    }

    pub fn start_time(&self) -> f64 {
        self.config.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.config.end_time
    }

    /// True while another step fits before the end time.
    pub fn run(&self) -> bool {
        self.value < self.config.end_time - 0.5 * self.delta_t
    }

    /// True when the current time should be written.
    pub fn write_time(&self) -> bool {
        self.write_time
    }

    /// Advance by one step and update the write flag.
    pub fn increment(&mut self) {
        self.delta_t0 = self.delta_t;
        self.value += self.delta_t;
        self.time_index += 1;

        self.write_time = match self.config.write_control {
            WriteControl::TimeStep => {
                let interval = (self.config.write_interval as usize).max(1);
                self.time_index % interval == 0
            }
            WriteControl::RunTime | WriteControl::AdjustableRunTime => {
                let index = ((self.value - self.config.start_time + 0.5 * self.delta_t)
                    / self.config.write_interval) as usize;
                if index > self.output_time_index {
                    self.output_time_index = index;
                    true
                } else {
                    false
                }
            }
        };
        if self.config.write_control == WriteControl::AdjustableRunTime {
            self.delta_t = self.requested_delta_t;
            self.adjust_delta_t();
        }
        // the last step is always written
        if !self.run() {
            self.write_time = true;
        }
    }

    /// Set the step size of the next step, shortened under
    /// `AdjustableRunTime` to land on the next write time.
    pub fn set_delta_t(&mut self, delta_t: f64) -> SimResult<()> {
        if !(delta_t.is_finite() && delta_t > 0.0) {
            return Err(SimError::invalid(format!("deltaT {delta_t} must be positive")));
        }
        self.delta_t = delta_t;
        self.requested_delta_t = delta_t;
        if self.config.write_control == WriteControl::AdjustableRunTime {
            self.adjust_delta_t();
        }
        Ok(())
    }

    fn adjust_delta_t(&mut self) {
        let interval = self.config.write_interval;
        let time_to_next_write = (((self.output_time_index + 1) as f64) * interval
            - (self.value - self.config.start_time))
            .max(0.0);
        let n_steps = time_to_next_write / self.delta_t - SMALL;
        if n_steps < (u32::MAX as f64) {
            let n_steps_to_next_write = n_steps.max(0.0) as u64 + 1;
            let new_delta_t = time_to_next_write / n_steps_to_next_write as f64;
            if new_delta_t >= self.delta_t {
                self.delta_t = new_delta_t.min(2.0 * self.delta_t);
            } else {
                self.delta_t = new_delta_t.max(0.2 * self.delta_t);
            }
        }
    }

    pub fn time_name(&self) -> String {
        time_name(self.value)
    }
}

/// Directory name of a time value: general format with 6 significant
/// digits (`0.1`, `0.005`, `100`, `1.23457e+06`, `1e-05`).
pub fn time_name(t: f64) -> String {
    const PRECISION: i32 = 6;
    if t == 0.0 {
        return "0".to_string();
    }
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, t);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (PRECISION - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{t:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
