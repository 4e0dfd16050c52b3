use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::wait_until_low_with_timeout;

/// Bit-banged HX711 24-bit ADC.
pub struct Hx711 {
    dt: InputPin,
    sck: OutputPin,
    /// Extra pulses after the 24 data bits; selects channel and gain of the
    /// next conversion (1 = A/128, 2 = B/32, 3 = A/64).
    gain_pulses: u8,
}

impl Hx711 {
    pub fn new(dt: InputPin, mut sck: OutputPin, gain_pulses: u8) -> Self {
        // SCK held high for >60us powers the chip down
        sck.set_low();
        Self {
            dt,
            sck,
            gain_pulses,
        }
    }

    /// Claim the BCM pins through the GPIO character device.
    pub fn from_pins(dt_pin: u8, sck_pin: u8, gain_pulses: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let dt = gpio
            .get(dt_pin)
            .map_err(|e| HwError::Gpio(format!("dt pin {dt_pin}: {e}")))?
            .into_input();
        let sck = gpio
            .get(sck_pin)
            .map_err(|e| HwError::Gpio(format!("sck pin {sck_pin}: {e}")))?
            .into_output();
        Ok(Self::new(dt, sck, gain_pulses))
    }

    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<i32> {
        let dt = &self.dt;
        wait_until_low_with_timeout(|| dt.is_high(), timeout, Duration::from_micros(200))?;

        let mut value: i32 = 0;
        for _ in 0..24 {
            self.sck.set_high();
            std::hint::spin_loop();
            value = (value << 1) | i32::from(self.dt.is_high());
            self.sck.set_low();
            std::hint::spin_loop();
        }

        for _ in 0..self.gain_pulses {
            self.sck.set_high();
            std::hint::spin_loop();
            self.sck.set_low();
            std::hint::spin_loop();
        }

        // two's complement, 24 -> 32 bits
        if (value & 0x80_0000) != 0 {
            value |= !0xFF_FFFF;
        }
        trace!(raw = value, "hx711 raw read");
        Ok(value)
    }
}
