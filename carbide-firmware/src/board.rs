//! Board wiring
//!
//! Concrete driver types for the reference RP2040 board. Pin assignments:
//!
//! | GPIO  | Function                                  |
//! |-------|-------------------------------------------|
//! | 0/1   | UART0 TX/RX, RS-485 command bus           |
//! | 2     | RS-485 driver enable                      |
//! | 4/5   | UART1 TX/RX, telemetry                    |
//! | 10    | INITIALIZE button (NO, active low)        |
//! | 11    | START button (NO, active low)             |
//! | 12    | Emergency stop chain (NC, high = tripped) |
//! | 13    | Hard reset key switch (NO, active low)    |
//! | 14    | Blower current switch (active low)        |
//! | 16    | PWM to 4-20 mA converter (SCR command)    |
//! | 18-21 | Threshold, PID, heating and error relays  |
//! | 26    | ADC0, element temperature loop            |
//! | 27    | ADC1, blower outlet temperature loop      |
//! | 28    | ADC2, heater current loop                 |

use core::cell::RefCell;

use embassy_rp::adc::{Adc, Blocking, Channel};
use embassy_rp::gpio::{Input, Output};
use embassy_rp::pwm::PwmOutput;
use embassy_rp::uart::BufferedUartTx;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Delay;

use carbide_core::Controller;
use carbide_drivers::{IndicatorRelays, LoopOutput, Rs485Port, SensorBank};
use carbide_hal::{AnalogError, AnalogInput};

/// RP2040 ADC resolution
const ADC_FULL_SCALE: u16 = 4095;

/// ADC reference (VREF tied to 3V3)
const ADC_REFERENCE_MV: u32 = 3300;

/// PWM counter top; the loop converter sees duty / (top + 1)
pub const LOOP_PWM_TOP: u16 = 999;

pub type SharedAdc = BlockingMutex<CriticalSectionRawMutex, RefCell<Adc<'static, Blocking>>>;

pub type LoopPwm = LoopOutput<PwmOutput<'static>>;
pub type PanelRelays = IndicatorRelays<Output<'static>>;
pub type FwController = Controller<LoopPwm, PanelRelays>;
pub type SharedController = Mutex<CriticalSectionRawMutex, FwController>;
pub type Sensors = SensorBank<AdcChannel, Input<'static>>;
pub type BusPort = Rs485Port<BufferedUartTx, Output<'static>, Delay>;

/// One input of the shared ADC
pub struct AdcChannel {
    adc: &'static SharedAdc,
    channel: Channel<'static>,
}

impl AdcChannel {
    pub fn new(adc: &'static SharedAdc, channel: Channel<'static>) -> Self {
        Self { adc, channel }
    }
}

impl AnalogInput for AdcChannel {
    fn read_raw(&mut self) -> Result<u16, AnalogError> {
        let channel = &mut self.channel;
        self.adc.lock(|adc| {
            let mut adc = adc.try_borrow_mut().map_err(|_| AnalogError::Busy)?;
            adc.blocking_read(channel)
                .map_err(|_| AnalogError::Conversion)
        })
    }

    fn full_scale(&self) -> u16 {
        ADC_FULL_SCALE
    }

    fn reference_mv(&self) -> u32 {
        ADC_REFERENCE_MV
    }
}
