//! Controller configuration.

use crate::ecc::fault::{CountdownInjector, FaultInjector, NoFaults, ProbabilisticInjector};
use crate::error::{Error, Result};

/// Which fault injector a controller runs after each encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Never corrupt blocks.
    Disabled,
    /// Flip a random bit in one of every `one_in` written blocks.
    Probabilistic { one_in: u32, seed: Option<u64> },
    /// Flip bit 0 of byte 0 on the `remaining`-th write.
    Countdown { remaining: u64 },
}

impl FaultPolicy {
    /// One fault per hundred writes, unseeded.
    pub fn probabilistic() -> Self {
        FaultPolicy::Probabilistic {
            one_in: ProbabilisticInjector::DEFAULT_ONE_IN,
            seed: None,
        }
    }
}

impl Default for FaultPolicy {
    fn default() -> Self {
        FaultPolicy::Disabled
    }
}

/// Configuration for an [`EccController`](crate::ecc::controller::EccController).
#[derive(Debug, Clone, Default)]
pub struct EccConfig {
    /// Fault injection strategy
    pub fault: FaultPolicy,
    /// Fail reads of blocks with no recorded parity instead of passing them through
    pub reject_untracked_reads: bool,
}

impl EccConfig {
    pub fn validate(&self) -> Result<()> {
        if let FaultPolicy::Probabilistic { one_in: 0, .. } = self.fault {
            return Err(Error::InvalidInput(
                "fault probability denominator must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn build_injector(&self) -> Result<Box<dyn FaultInjector + Send>> {
        Ok(match self.fault {
            FaultPolicy::Disabled => Box::new(NoFaults),
            FaultPolicy::Probabilistic { one_in, seed } => {
                Box::new(ProbabilisticInjector::new(one_in, seed)?)
            }
            FaultPolicy::Countdown { remaining } => Box::new(CountdownInjector::new(remaining)),
        })
    }
}
