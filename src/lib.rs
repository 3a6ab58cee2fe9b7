//! Netatmo thermostat and weather-station neuron.
//!
//! The host builds a [`config::Config`], calls [`services::dispatch::run`] with a
//! [`services::dispatch::ResultSink`], and speaks whatever record the sink receives.

pub mod models {
    pub mod netatmo;
}

pub mod client;
pub mod config;
pub mod utils;
pub mod services {
    pub mod dispatch;
    pub mod energy;
    #[cfg(test)]
    pub mod fake;
    pub mod weather;
}

pub use client::{NetatmoApi, NetatmoClient, NetatmoClientError};
pub use config::{Config, ParameterError};
pub use services::dispatch::{ActionDispatcher, NeuronError, ResultRecord, ResultSink, run};
