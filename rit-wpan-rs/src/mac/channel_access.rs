//! The carrier-sense front-ends the MAC routes outgoing frames through.
//!
//! Three implementations of one capability: standard unslotted CSMA-CA,
//! Pre-CS (a single immediate CCA, no backoff, no retry) and Pre-CSB (the
//! same contract, sitting first in the dispatch chain). The PHY's CCA
//! confirm enters the chain at Pre-CSB; a front-end that did not request the
//! running CCA forwards the confirm to its fallback, so the confirm always
//! reaches the active requestor: Pre-CSB -> Pre-CS -> CSMA-CA.

use rand::Rng;
use rand_core::RngCore;

use crate::{consts::UNIT_BACKOFF_PERIOD, phy::CcaStatus, time::Duration};

pub const MAC_MIN_BE: u8 = 3;
pub const MAC_MAX_BE: u8 = 5;
pub const MAC_MAX_CSMA_BACKOFFS: u8 = 4;

/// Which front-end the MAC hands an outgoing frame to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum FrontEnd {
    CsmaCa,
    PreCs,
    PreCsB,
}

/// The next CCA to perform, optionally preceded by a backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcaPlan {
    pub backoff: Option<Duration>,
}

/// What a front-end concluded from a CCA confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcaVerdict {
    /// The channel is clear; the MAC may transmit.
    ChannelIdle,
    /// Channel access failed terminally for this frame.
    ChannelAccessFailure,
    /// Perform another CCA after the contained plan.
    Retry(CcaPlan),
    /// This front-end is not the active requestor; hand the confirm to the
    /// fallback.
    Fallthrough,
}

/// The capability shared by all carrier-sense front-ends.
pub trait ChannelAccess {
    /// Begin channel access for one frame and return the first CCA to run.
    fn start(&mut self, rng: &mut dyn RngCore) -> CcaPlan;

    /// Abort a running channel access attempt. Idempotent.
    fn cancel(&mut self);

    /// Process a CCA confirm from the PHY.
    fn cca_confirm(&mut self, status: CcaStatus, rng: &mut dyn RngCore) -> CcaVerdict;

    /// Whether this front-end is the active CCA requestor.
    fn is_running(&self) -> bool;
}

/// Single-shot carrier sense: one immediate CCA, no backoff, no retry.
#[derive(Debug, Default)]
pub struct PreCs {
    cca_request_running: bool,
}

impl ChannelAccess for PreCs {
    fn start(&mut self, _rng: &mut dyn RngCore) -> CcaPlan {
        debug!("Starting Pre-CS, immediate CCA request");
        self.cca_request_running = true;
        CcaPlan { backoff: None }
    }

    fn cancel(&mut self) {
        self.cca_request_running = false;
    }

    fn cca_confirm(&mut self, status: CcaStatus, _rng: &mut dyn RngCore) -> CcaVerdict {
        if !self.cca_request_running {
            return CcaVerdict::Fallthrough;
        }
        self.cca_request_running = false;

        match status {
            CcaStatus::Idle => CcaVerdict::ChannelIdle,
            _ => CcaVerdict::ChannelAccessFailure,
        }
    }

    fn is_running(&self) -> bool {
        self.cca_request_running
    }
}

/// The Pre-CS variant bound directly to the PHY's CCA confirm; first in the
/// dispatch chain.
#[derive(Debug, Default)]
pub struct PreCsB {
    cca_request_running: bool,
}

impl ChannelAccess for PreCsB {
    fn start(&mut self, _rng: &mut dyn RngCore) -> CcaPlan {
        debug!("Starting Pre-CSB, immediate CCA request");
        self.cca_request_running = true;
        CcaPlan { backoff: None }
    }

    fn cancel(&mut self) {
        self.cca_request_running = false;
    }

    fn cca_confirm(&mut self, status: CcaStatus, _rng: &mut dyn RngCore) -> CcaVerdict {
        if !self.cca_request_running {
            return CcaVerdict::Fallthrough;
        }
        self.cca_request_running = false;

        match status {
            CcaStatus::Idle => CcaVerdict::ChannelIdle,
            _ => CcaVerdict::ChannelAccessFailure,
        }
    }

    fn is_running(&self) -> bool {
        self.cca_request_running
    }
}

/// Standard unslotted CSMA-CA: random backoff windows with a growing backoff
/// exponent and a bounded number of attempts.
#[derive(Debug)]
pub struct CsmaCa {
    cca_request_running: bool,
    nb: u8,
    be: u8,
    pub min_be: u8,
    pub max_be: u8,
    pub max_backoffs: u8,
}

impl Default for CsmaCa {
    fn default() -> Self {
        Self {
            cca_request_running: false,
            nb: 0,
            be: MAC_MIN_BE,
            min_be: MAC_MIN_BE,
            max_be: MAC_MAX_BE,
            max_backoffs: MAC_MAX_CSMA_BACKOFFS,
        }
    }
}

impl CsmaCa {
    fn random_backoff(&self, rng: &mut dyn RngCore) -> Duration {
        let slots = rng.gen_range(0..1u32 << self.be);
        Duration::from_symbols(slots as i64 * UNIT_BACKOFF_PERIOD as i64)
    }
}

impl ChannelAccess for CsmaCa {
    fn start(&mut self, rng: &mut dyn RngCore) -> CcaPlan {
        debug!("Starting unslotted CSMA-CA");
        self.nb = 0;
        self.be = self.min_be;
        self.cca_request_running = true;
        CcaPlan {
            backoff: Some(self.random_backoff(rng)),
        }
    }

    fn cancel(&mut self) {
        self.cca_request_running = false;
    }

    fn cca_confirm(&mut self, status: CcaStatus, rng: &mut dyn RngCore) -> CcaVerdict {
        if !self.cca_request_running {
            return CcaVerdict::Fallthrough;
        }

        match status {
            CcaStatus::Idle => {
                self.cca_request_running = false;
                CcaVerdict::ChannelIdle
            }
            _ => {
                self.nb += 1;
                self.be = (self.be + 1).min(self.max_be);

                if self.nb > self.max_backoffs {
                    self.cca_request_running = false;
                    CcaVerdict::ChannelAccessFailure
                } else {
                    CcaVerdict::Retry(CcaPlan {
                        backoff: Some(self.random_backoff(rng)),
                    })
                }
            }
        }
    }

    fn is_running(&self) -> bool {
        self.cca_request_running
    }
}

/// The installed front-ends with their fallback wiring.
#[derive(Debug, Default)]
pub struct ChannelAccessChain {
    pub pre_csb: PreCsB,
    pub pre_cs: PreCs,
    pub csma: CsmaCa,
}

impl ChannelAccessChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, front_end: FrontEnd, rng: &mut dyn RngCore) -> CcaPlan {
        match front_end {
            FrontEnd::CsmaCa => self.csma.start(rng),
            FrontEnd::PreCs => self.pre_cs.start(rng),
            FrontEnd::PreCsB => self.pre_csb.start(rng),
        }
    }

    /// Dispatch a CCA confirm from the PHY. It enters at Pre-CSB and falls
    /// through inactive front-ends until it reaches the active requestor.
    pub fn cca_confirm(&mut self, status: CcaStatus, rng: &mut dyn RngCore) -> CcaVerdict {
        match self.pre_csb.cca_confirm(status, rng) {
            CcaVerdict::Fallthrough => {}
            verdict => return verdict,
        }
        match self.pre_cs.cca_confirm(status, rng) {
            CcaVerdict::Fallthrough => {}
            verdict => return verdict,
        }
        self.csma.cca_confirm(status, rng)
    }

    /// Cancel whichever front-end is mid-CCA. Idempotent.
    pub fn cancel(&mut self) {
        self.pre_csb.cancel();
        self.pre_cs.cancel();
        self.csma.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.pre_csb.is_running() || self.pre_cs.is_running() || self.csma.is_running()
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;

    #[test]
    fn pre_cs_is_single_shot() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut pre_cs = PreCs::default();

        let plan = pre_cs.start(&mut rng);
        assert_eq!(plan.backoff, None);
        assert_eq!(
            pre_cs.cca_confirm(CcaStatus::Idle, &mut rng),
            CcaVerdict::ChannelIdle
        );

        pre_cs.start(&mut rng);
        assert_eq!(
            pre_cs.cca_confirm(CcaStatus::Busy, &mut rng),
            CcaVerdict::ChannelAccessFailure
        );

        // No retry: a further confirm falls through to the fallback
        assert_eq!(
            pre_cs.cca_confirm(CcaStatus::Idle, &mut rng),
            CcaVerdict::Fallthrough
        );
    }

    #[test]
    fn csma_retries_are_bounded() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut csma = CsmaCa::default();

        let plan = csma.start(&mut rng);
        assert!(plan.backoff.is_some());

        let mut failures = 0;
        loop {
            match csma.cca_confirm(CcaStatus::Busy, &mut rng) {
                CcaVerdict::Retry(plan) => {
                    let backoff = plan.backoff.expect("csma always backs off");
                    // 2^macMaxBE - 1 slots of aUnitBackoffPeriod symbols
                    assert!(backoff <= Duration::from_symbols(31 * UNIT_BACKOFF_PERIOD as i64));
                    failures += 1;
                }
                CcaVerdict::ChannelAccessFailure => break,
                other => panic!("unexpected verdict {other:?}"),
            }
        }

        assert_eq!(failures, MAC_MAX_CSMA_BACKOFFS as usize);
    }

    #[test]
    fn confirm_reaches_the_active_requestor() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut chain = ChannelAccessChain::new();

        // CSMA is active; the confirm enters at Pre-CSB and falls through
        chain.start(FrontEnd::CsmaCa, &mut rng);
        assert!(!chain.pre_csb.is_running());
        assert!(!chain.pre_cs.is_running());
        assert_eq!(
            chain.cca_confirm(CcaStatus::Idle, &mut rng),
            CcaVerdict::ChannelIdle
        );

        // Pre-CS active: Pre-CSB forwards, Pre-CS consumes
        chain.start(FrontEnd::PreCs, &mut rng);
        assert_eq!(
            chain.cca_confirm(CcaStatus::Busy, &mut rng),
            CcaVerdict::ChannelAccessFailure
        );
    }

    #[test]
    fn cancel_clears_the_running_flag() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut chain = ChannelAccessChain::new();

        chain.start(FrontEnd::PreCsB, &mut rng);
        assert!(chain.is_running());

        chain.cancel();
        chain.cancel();
        assert!(!chain.is_running());

        // A late confirm after cancellation reaches nobody
        assert_eq!(
            chain.cca_confirm(CcaStatus::Idle, &mut rng),
            CcaVerdict::Fallthrough
        );
    }
}
