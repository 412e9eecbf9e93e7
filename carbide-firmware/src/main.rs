//! Carbide - SiC Heater Controller Firmware
//!
//! Main firmware binary for RP2040-based heater control boards. Drives
//! silicon-carbide elements through an SCR power unit on a 4-20 mA loop,
//! with an RS-485 command bus and a read-only telemetry port.

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel, Config as AdcConfig};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::{UART0, UART1};
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Delay;
use portable_atomic::Ordering;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use carbide_core::config::{parse_config, ControllerConfig};
use carbide_core::Controller;
use carbide_drivers::{
    AirflowSwitch, IndicatorRelays, LoopOutput, LoopTransmitter, PanelInputs, Rs485Port,
    SensorBank, TransmitterConfig,
};
use carbide_hal::LineSettings;

use crate::board::{AdcChannel, SharedAdc, SharedController, LOOP_PWM_TOP};
use crate::channels::CYCLE_OVERRUNS;

/// Embedded configuration (compiled into firmware)
/// Edit controller.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../controller.toml");

mod board;
mod channels;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    UART1_IRQ => BufferedInterruptHandler<UART1>;
});

// Static cells for UART buffers (must live forever)
static BUS_TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static BUS_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static LOG_TX_BUF: StaticCell<[u8; 512]> = StaticCell::new();
static LOG_RX_BUF: StaticCell<[u8; 64]> = StaticCell::new();

static ADC: StaticCell<SharedAdc> = StaticCell::new();
static CONTROLLER: StaticCell<SharedController> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Carbide firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();

    // Analog loop inputs share the one converter
    let adc: &'static SharedAdc = ADC.init(BlockingMutex::new(RefCell::new(Adc::new_blocking(
        p.ADC,
        AdcConfig::default(),
    ))));
    let sensors = SensorBank {
        temperature: LoopTransmitter::new(
            AdcChannel::new(adc, Channel::new_pin(p.PIN_26, Pull::None)),
            TransmitterConfig::temperature(&config.sensors),
        ),
        secondary: LoopTransmitter::new(
            AdcChannel::new(adc, Channel::new_pin(p.PIN_27, Pull::None)),
            TransmitterConfig::secondary(&config.sensors),
        ),
        current: LoopTransmitter::new(
            AdcChannel::new(adc, Channel::new_pin(p.PIN_28, Pull::None)),
            TransmitterConfig::current(&config.sensors),
        ),
        airflow: AirflowSwitch::new(Input::new(p.PIN_14, Pull::Up)),
        panel: PanelInputs::new(
            Input::new(p.PIN_10, Pull::Up),
            Input::new(p.PIN_11, Pull::Up),
            Input::new(p.PIN_12, Pull::Up),
            Input::new(p.PIN_13, Pull::Up),
        ),
    };
    info!("Sensors initialized");

    // SCR command loop: PWM into the V/I converter, held at 0 until init
    let mut pwm_config = PwmConfig::default();
    pwm_config.top = LOOP_PWM_TOP;
    pwm_config.compare_a = 0;
    let pwm = Pwm::new_output_a(p.PWM_SLICE0, p.PIN_16, pwm_config);
    let (loop_pwm, _) = pwm.split();
    let loop_pwm = unwrap!(loop_pwm);

    let mut relays = IndicatorRelays::new(
        Output::new(p.PIN_18, Level::Low),
        Output::new(p.PIN_19, Level::Low),
        Output::new(p.PIN_20, Level::Low),
        Output::new(p.PIN_21, Level::Low),
        config.indicators,
    );
    relays.all_off();

    let mut controller = Controller::new(config, LoopOutput::new(loop_pwm), relays);
    if let Err(e) = controller.init() {
        error!("Output init failed: {:?}", e);
    }
    let controller: &'static SharedController = CONTROLLER.init(Mutex::new(controller));
    info!("Controller initialized");

    spawner
        .spawn(tasks::control_task(controller, sensors, config.control.cycle_ms))
        .unwrap();

    if config.protocol.rs485_enabled {
        let mut uart_config = UartConfig::default();
        uart_config.baudrate = config.protocol.rs485_baudrate;
        let tx_buf = BUS_TX_BUF.init([0u8; 256]);
        let rx_buf = BUS_RX_BUF.init([0u8; 256]);
        let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config)
            .into_buffered(Irqs, tx_buf, rx_buf);
        let (tx, rx) = uart.split();

        let port = Rs485Port::new(
            tx,
            Output::new(p.PIN_2, Level::Low),
            Delay,
            LineSettings::new(config.protocol.rs485_baudrate),
        );
        spawner
            .spawn(tasks::rs485_task(
                controller,
                rx,
                port,
                config.protocol.fragment_timeout_ms,
            ))
            .unwrap();
        info!("RS-485 bus initialized");
    }

    if config.protocol.telemetry_enabled {
        let mut uart_config = UartConfig::default();
        uart_config.baudrate = config.protocol.telemetry_baudrate;
        let tx_buf = LOG_TX_BUF.init([0u8; 512]);
        let rx_buf = LOG_RX_BUF.init([0u8; 64]);
        let uart = Uart::new_blocking(p.UART1, p.PIN_4, p.PIN_5, uart_config)
            .into_buffered(Irqs, tx_buf, rx_buf);
        let (tx, rx) = uart.split();

        spawner
            .spawn(tasks::telemetry_task(
                controller,
                tx,
                rx,
                config.telemetry.interval_ms,
                config.protocol.fragment_timeout_ms,
            ))
            .unwrap();
        info!("Telemetry port initialized");
    }

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!(
            "Main loop heartbeat, {} cycle overruns",
            CYCLE_OVERRUNS.load(Ordering::Relaxed)
        );
    }
}

/// Parse the embedded controller.toml
///
/// build.rs validates the same file, so a failure here means the no_std
/// reader and the build-time check disagree. Fall back to built-in
/// defaults rather than refusing to boot.
fn load_config() -> ControllerConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            warn!("Using built-in default configuration");
            ControllerConfig::default()
        }
    }
}
