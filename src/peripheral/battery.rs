use core::fmt;

use crate::peripheral_traits::{Attenuation, Resolution, SampleSource};

// 11 bit is allegedly more linear than 12 bit.
pub const SAMPLE_RESOLUTION: Resolution = Resolution::Bits11;
pub const SAMPLE_ATTENUATION: Attenuation = Attenuation::Db11;

// Linear calibration and charge thresholds for a BatteryMonitor.
// The measured voltage is `raw_mv * scale_per_mille / 1000 + bias_mv`, where
// `raw_mv` is the average of `sample_count` readings. `min_mv` maps to 0 % and
// `max_mv` to 100 %.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryConfig {
    pub scale_per_mille: i32,
    pub bias_mv: i32,
    pub sample_count: u16,
    pub min_mv: i32,
    pub max_mv: i32,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        BatteryConfig {
            scale_per_mille: 1000,
            bias_mv: 0,
            sample_count: 10,
            // Conservative empty voltage for a single Li-ion cell
            min_mv: 3400,
            max_mv: 4200,
        }
    }
}

impl BatteryConfig {
    pub fn with_scale_per_mille(self, scale_per_mille: i32) -> Self {
        BatteryConfig {
            scale_per_mille,
            ..self
        }
    }

    pub fn with_bias_mv(self, bias_mv: i32) -> Self {
        BatteryConfig { bias_mv, ..self }
    }

    pub fn with_sample_count(self, sample_count: u16) -> Self {
        BatteryConfig {
            sample_count,
            ..self
        }
    }

    pub fn with_range_mv(self, min_mv: i32, max_mv: i32) -> Self {
        BatteryConfig {
            min_mv,
            max_mv,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_count == 0 {
            return Err(ConfigError::NoSamples);
        }
        if self.max_mv <= self.min_mv {
            return Err(ConfigError::InvertedRange {
                min_mv: self.min_mv,
                max_mv: self.max_mv,
            });
        }
        Ok(())
    }

    // Applies scale and bias to an averaged reading.
    // Multiplies before dividing and truncates toward zero. Results outside
    // the `i32` range saturate.
    pub fn calibrate(&self, raw_mv: i64) -> i32 {
        let calibrated = raw_mv * i64::from(self.scale_per_mille) / 1000 + i64::from(self.bias_mv);
        calibrated.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    NoSamples,
    InvertedRange { min_mv: i32, max_mv: i32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoSamples => write!(f, "sample count must be at least 1"),
            ConfigError::InvertedRange { min_mv, max_mv } => write!(
                f,
                "full voltage {} mV must be above empty voltage {} mV",
                max_mv, min_mv
            ),
        }
    }
}

impl core::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    Unmeasured,
    Measured(i32),
}

impl Measurement {
    pub fn value(self) -> Option<i32> {
        match self {
            Measurement::Unmeasured => None,
            Measurement::Measured(mv) => Some(mv),
        }
    }
}

// Maps a voltage onto 0..=100 % between `min_mv` and `max_mv`.
pub fn percentage_for(config: &BatteryConfig, voltage_mv: i32) -> u8 {
    if voltage_mv > config.max_mv {
        100
    } else if voltage_mv < config.min_mv {
        0
    } else {
        let span = i64::from(config.max_mv) - i64::from(config.min_mv);
        // Only reachable with min_mv == max_mv == voltage_mv.
        if span <= 0 {
            return 100;
        }
        let above_empty = i64::from(voltage_mv) - i64::from(config.min_mv);
        (above_empty * 100 / span) as u8
    }
}

pub struct BatteryMonitor<Source>
where
    Source: SampleSource,
{
    source: Source,
    channel: Source::Channel,
    config: BatteryConfig,
    last: Measurement,
}

impl<Source> BatteryMonitor<Source>
where
    Source: SampleSource,
{
    pub fn new(
        source: Source,
        channel: Source::Channel,
        config: BatteryConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(source, channel, config))
    }

    pub fn with_defaults(source: Source, channel: Source::Channel) -> Self {
        Self::from_parts(source, channel, BatteryConfig::default())
    }

    fn from_parts(source: Source, channel: Source::Channel, config: BatteryConfig) -> Self {
        BatteryMonitor {
            source,
            channel,
            config,
            last: Measurement::Unmeasured,
        }
    }

    // Samples the battery, replacing any cached voltage.
    // Blocks for `sample_count` conversions. If a read fails the cached
    // voltage is left as it was.
    pub fn measure(&mut self) -> Result<&mut Self, Source::Error> {
        self.sample()?;
        Ok(self)
    }

    // Cached voltage. Measures first if nothing was measured yet.
    pub fn voltage_mv(&mut self) -> Result<i32, Source::Error> {
        match self.last {
            Measurement::Measured(mv) => Ok(mv),
            Measurement::Unmeasured => self.sample(),
        }
    }

    // Rough state of charge from the cached voltage. Ignores the nonlinear
    // discharge curve of the cell.
    pub fn percentage(&mut self) -> Result<u8, Source::Error> {
        let voltage_mv = self.voltage_mv()?;
        Ok(percentage_for(&self.config, voltage_mv))
    }

    pub fn last_measurement(&self) -> Measurement {
        self.last
    }

    pub fn config(&self) -> &BatteryConfig {
        &self.config
    }

    pub fn channel(&self) -> &Source::Channel {
        &self.channel
    }

    pub fn release(self) -> (Source, Source::Channel) {
        (self.source, self.channel)
    }

    fn sample(&mut self) -> Result<i32, Source::Error> {
        self.source.configure(SAMPLE_RESOLUTION, SAMPLE_ATTENUATION);

        let count = self.config.sample_count;
        let mut sum: u64 = 0;
        for _ in 0..count {
            sum += u64::from(self.source.read_millivolts(&mut self.channel)?);
        }

        let average = (sum / u64::from(count)) as i64;
        let voltage_mv = self.config.calibrate(average);
        log::debug!(
            "battery: {} samples, avg {} mV, calibrated {} mV",
            count,
            average,
            voltage_mv
        );

        self.last = Measurement::Measured(voltage_mv);
        Ok(voltage_mv)
    }
}
