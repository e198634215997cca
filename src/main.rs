#![no_std]
#![no_main]

use core::fmt::Display;

use esp_backtrace as _;
use esp_println::println;
use hal::{
    adc::{AdcConfig, ADC, ADC1},
    clock::ClockControl,
    peripherals::Peripherals,
    prelude::*,
    timer::TimerGroup,
    Delay, Rtc, IO,
};

use critical_section::{with, Mutex};

use battery_monitor_esp32::peripheral::battery::{BatteryConfig, BatteryMonitor};
use battery_monitor_esp32::peripheral_traits::Attenuation;

mod peripheral_adapter;
use peripheral_adapter::{Adc1Sampler, Global};

static GL_ADC1: Global<ADC<'static, ADC1>> = Mutex::new(core::cell::RefCell::new(None));

const BATTERY_ATTENUATION: Attenuation = Attenuation::Db11;

// 1:2 resistor divider between the cell and GPIO5
const BATTERY_CONFIG: BatteryConfig = BatteryConfig {
    scale_per_mille: 2000,
    bias_mv: 0,
    sample_count: 16,
    min_mv: 3400,
    max_mv: 4200,
};

const REPORT_INTERVAL_MS: u32 = 1000;

fn halt(reason: impl Display) -> ! {
    log::error!("halted: {}", reason);
    loop {}
}

#[entry]
fn main() -> ! {
    let peripherals = Peripherals::take();
    let mut system = peripherals.SYSTEM.split();
    let clocks = ClockControl::boot_defaults(system.clock_control).freeze();
    let mut delay = Delay::new(&clocks);

    esp_println::logger::init_logger(log::LevelFilter::Info);

    // Disable the watchdog timers. For the ESP32-S3, this includes the RTC WDT, and
    // the TIMG WDT.
    let mut rtc = Rtc::new(peripherals.RTC_CNTL);
    let timer_group0 = TimerGroup::new(
        peripherals.TIMG0,
        &clocks,
        &mut system.peripheral_clock_control,
    );
    let mut wdt = timer_group0.wdt;

    wdt.disable();
    rtc.rwdt.disable();

    let io = IO::new(peripherals.GPIO, peripherals.IO_MUX);

    /* Battery ADC */
    let analog = peripherals.SENS.split();
    let mut adc1_config = AdcConfig::new();
    let battery_pin = adc1_config.enable_pin(
        io.pins.gpio5.into_analog(),
        peripheral_adapter::hal_attenuation(BATTERY_ATTENUATION),
    );
    let adc1 = match ADC::<ADC1>::adc(analog.adc1, adc1_config) {
        Ok(adc1) => adc1,
        Err(_) => halt("ADC1 init failed"),
    };

    with(|cs| {
        GL_ADC1.borrow(cs).replace(Some(adc1));
    });

    let sampler = Adc1Sampler::new(BATTERY_ATTENUATION);
    let mut battery = match BatteryMonitor::new(sampler, battery_pin, BATTERY_CONFIG) {
        Ok(battery) => battery,
        Err(e) => halt(e),
    };

    loop {
        let report = battery
            .measure()
            .and_then(|b| Ok((b.voltage_mv()?, b.percentage()?)));

        match report {
            Ok((mv, percent)) => println!("battery {:04} mV {:3} %", mv, percent),
            Err(e) => log::warn!("battery read failed: {:?}", e),
        }

        delay.delay_ms(REPORT_INTERVAL_MS);
    }
}
