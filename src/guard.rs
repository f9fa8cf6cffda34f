//! Single-flight guard
//!
//! Rejects a second caller while an operation is running instead of
//! queueing it. The permit returns the guard to idle when dropped, so every
//! exit path (success, error, unwind) releases it.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{CoreError, Result};

/// Guard state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FlightState {
    Idle = 0,
    InFlight = 1,
}

/// At most one holder at a time
#[derive(Debug)]
pub struct SingleFlight {
    state: AtomicU8,
    operation: &'static str,
}

impl SingleFlight {
    pub const fn new(operation: &'static str) -> Self {
        Self {
            state: AtomicU8::new(FlightState::Idle as u8),
            operation,
        }
    }

    pub fn state(&self) -> FlightState {
        match self.state.load(Ordering::Acquire) {
            0 => FlightState::Idle,
            _ => FlightState::InFlight,
        }
    }

    /// Take the guard, or fail with [`CoreError::Busy`] if it is held.
    pub fn try_acquire(&self) -> Result<FlightPermit<'_>> {
        self.state
            .compare_exchange(
                FlightState::Idle as u8,
                FlightState::InFlight as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| FlightPermit { flight: self })
            .map_err(|_| CoreError::Busy(self.operation.to_string()))
    }
}

/// Proof of holding a [`SingleFlight`]
#[derive(Debug)]
pub struct FlightPermit<'a> {
    flight: &'a SingleFlight,
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.flight
            .state
            .store(FlightState::Idle as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_second_acquire_is_busy() {
        let flight = SingleFlight::new("publish");
        let permit = flight.try_acquire().unwrap();
        assert_eq!(flight.state(), FlightState::InFlight);

        let err = flight.try_acquire().unwrap_err();
        assert_eq!(err, CoreError::Busy("publish".to_string()));

        drop(permit);
        assert_eq!(flight.state(), FlightState::Idle);
        assert!(flight.try_acquire().is_ok());
    }

    #[test]
    fn test_released_on_unwind() {
        let flight = SingleFlight::new("publish");
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _permit = flight.try_acquire().unwrap();
            panic!("upload exploded");
        }));

        assert!(outcome.is_err());
        assert_eq!(flight.state(), FlightState::Idle);
    }
}
