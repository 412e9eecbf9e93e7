//! Sensor bank
//!
//! Owns every input driver and exposes them as one
//! [`SensorPorts`] implementation.

use carbide_core::traits::{DiscreteInputs, SensorError, SensorPorts};
use carbide_hal::AnalogInput;
use embedded_hal::digital::InputPin;

use super::{AirflowSwitch, LoopTransmitter, PanelInputs};

pub struct SensorBank<A, P> {
    pub temperature: LoopTransmitter<A>,
    pub secondary: LoopTransmitter<A>,
    pub current: LoopTransmitter<A>,
    pub airflow: AirflowSwitch<P>,
    pub panel: PanelInputs<P>,
}

impl<A: AnalogInput, P: InputPin> SensorPorts for SensorBank<A, P> {
    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.temperature.read()
    }

    fn read_secondary_temperature(&mut self) -> Result<f32, SensorError> {
        self.secondary.read()
    }

    fn read_current(&mut self) -> Result<f32, SensorError> {
        self.current.read()
    }

    fn read_airflow(&mut self) -> bool {
        self.airflow.is_running()
    }

    fn read_discrete(&mut self) -> DiscreteInputs {
        self.panel.read()
    }
}
