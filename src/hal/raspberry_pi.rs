//! # Raspberry Pi Control Lines
//!
//! M0/M1 and AUX on BCM GPIO through `rppal`. Both mode-select outputs come
//! up high (sleep mode) like the module's own power-on state. The AUX input
//! carries an asynchronous rising-edge interrupt whose callback forwards a
//! `BusyEdge` onto the handler's edge queue.
//!
//! ## Wiring (defaults)
//!
//! ```text
//! E22 Pin │ Pi GPIO │ Pi Pin
//! ────────┼─────────┼───────
//! M0      │ 23      │ 16
//! M1      │ 24      │ 18
//! AUX     │ 25      │ 22
//! TXD     │ 15 (RX) │ 10
//! RXD     │ 14 (TX) │ 8
//! ```

use crate::config::GpioPins;
use crate::error::EbyteError;
use crate::hal::{BusyEdge, ControlLines, EdgeSender, LINE_HIGH, LINE_LOW};
use log::{debug, info};
use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};

fn level(value: u8) -> Level {
    if value == LINE_LOW {
        Level::Low
    } else {
        Level::High
    }
}

fn value(level: Level) -> u8 {
    match level {
        Level::Low => LINE_LOW,
        Level::High => LINE_HIGH,
    }
}

/// M0, M1 and AUX lines of one module
pub struct RaspberryPiLines {
    m0: OutputPin,
    m1: OutputPin,
    aux: InputPin,
    pins: GpioPins,
}

impl RaspberryPiLines {
    pub fn new(pins: GpioPins) -> Result<Self, EbyteError> {
        let gpio = Gpio::new()?;
        let m0 = gpio.get(pins.m0)?.into_output_high();
        let m1 = gpio.get(pins.m1)?.into_output_high();
        let aux = gpio.get(pins.aux)?.into_input();

        info!(
            "GPIO lines ready: M0={}, M1={}, AUX={}",
            pins.m0, pins.m1, pins.aux
        );
        Ok(Self { m0, m1, aux, pins })
    }

    pub fn pins(&self) -> GpioPins {
        self.pins
    }
}

impl ControlLines for RaspberryPiLines {
    fn mode_levels(&self) -> Result<(u8, u8), EbyteError> {
        let read = |pin: &OutputPin| if pin.is_set_high() { LINE_HIGH } else { LINE_LOW };
        Ok((read(&self.m0), read(&self.m1)))
    }

    fn set_mode_levels(&mut self, m0: u8, m1: u8) -> Result<(), EbyteError> {
        self.m0.write(level(m0));
        self.m1.write(level(m1));
        Ok(())
    }

    fn busy_level(&self) -> Result<u8, EbyteError> {
        Ok(value(self.aux.read()))
    }

    fn watch_busy_edges(&mut self, edges: EdgeSender) -> Result<(), EbyteError> {
        self.aux.set_async_interrupt(Trigger::RisingEdge, move |_level| {
            // Receiver gone means the handler has shut down
            let _ = edges.send(BusyEdge::now());
        })?;
        debug!("Watching AUX (GPIO {}) for rising edges", self.pins.aux);
        Ok(())
    }

    fn release(&mut self) -> Result<(), EbyteError> {
        self.aux.clear_async_interrupt()?;
        debug!("AUX interrupt cleared");
        Ok(())
    }
}
