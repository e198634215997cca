use core::cell::RefCell;

use critical_section::{with, Mutex};
use embedded_hal::adc::OneShot;
use esp_backtrace as _;
use hal::{
    adc::{self, AdcPin, ADC, ADC1},
    gpio::{Analog, GpioPin},
};

use battery_monitor_esp32::peripheral_traits::{
    code_to_millivolts, Attenuation, Resolution, SampleSource,
};

use crate::GL_ADC1;

pub type Global<T> = Mutex<RefCell<Option<T>>>;

pub type BatteryPin = AdcPin<GpioPin<Analog, 5>, ADC1>;

// The S3 SAR ADC always converts at 12 bit.
const HARDWARE_RESOLUTION: Resolution = Resolution::Bits12;

pub fn hal_attenuation(attenuation: Attenuation) -> adc::Attenuation {
    match attenuation {
        Attenuation::Db0 => adc::Attenuation::Attenuation0dB,
        Attenuation::Db2_5 => adc::Attenuation::Attenuation2p5dB,
        Attenuation::Db6 => adc::Attenuation::Attenuation6dB,
        Attenuation::Db11 => adc::Attenuation::Attenuation11dB,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdcError {
    NotInitialized,
    Conversion,
}

// Samples through the ADC1 instance stored in GL_ADC1.
pub struct Adc1Sampler {
    // Fixed when the pin was enabled, configure() cannot change it.
    pin_attenuation: Attenuation,
    resolution: Resolution,
}

impl Adc1Sampler {
    pub fn new(pin_attenuation: Attenuation) -> Self {
        Adc1Sampler {
            pin_attenuation,
            resolution: HARDWARE_RESOLUTION,
        }
    }
}

impl SampleSource for Adc1Sampler {
    type Channel = BatteryPin;
    type Error = AdcError;

    fn configure(&mut self, resolution: Resolution, attenuation: Attenuation) {
        self.resolution = resolution;
        if attenuation != self.pin_attenuation {
            log::warn!(
                "adc: {:?} requested but pin is enabled with {:?}",
                attenuation,
                self.pin_attenuation
            );
        }
    }

    fn read_millivolts(&mut self, pin: &mut BatteryPin) -> Result<u32, AdcError> {
        let raw = with(|cs| {
            let mut adc = GL_ADC1.borrow(cs).borrow_mut();
            let adc: &mut ADC<'static, ADC1> = adc.as_mut().ok_or(AdcError::NotInitialized)?;
            nb::block!(adc.read(pin)).map_err(|_| AdcError::Conversion)
        })?;

        // Linear conversion from the nominal full scale. Unlike the IDF's
        // analogReadMilliVolts this ignores the per-chip eFuse calibration, so
        // expect tens of mV of offset; correct it with scale_per_mille and bias_mv.
        Ok(code_to_millivolts(
            raw,
            HARDWARE_RESOLUTION,
            self.resolution,
            self.pin_attenuation,
        ))
    }
}
