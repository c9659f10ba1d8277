//! The budget-constrained intervention planners for the mobile and fixed engines.
//!
//! Both planners walk a ranked list of actions and deduct each from an annual [`Budget`]. The
//! mobile planner commits to an action before looking at the balance, so its last action of a
//! year may overrun the budget. The fixed planner refuses any action it cannot afford and stops
//! there.
use crate::units::Money;
use log::warn;

pub mod fixed;
pub mod mobile;

/// An annual budget which is spent action by action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    annual: Money,
    remaining: Money,
    exhausted: bool,
}

impl Budget {
    /// Start a year with the full annual budget
    pub fn new(annual: Money) -> Self {
        Self {
            annual,
            remaining: annual,
            exhausted: false,
        }
    }

    /// Try to pay for an action.
    ///
    /// Returns `false` if the cost exceeds the remaining budget. Once an action has been refused,
    /// every later action is refused too.
    pub fn try_spend(&mut self, cost: Money) -> bool {
        if self.exhausted {
            return false;
        }

        if cost > self.remaining {
            warn!(
                "Budget exhausted: cannot afford {cost} GBP with {} GBP remaining",
                self.remaining
            );
            self.exhausted = true;
            return false;
        }

        self.remaining -= cost;
        true
    }

    /// Pay for an action whether or not it can be afforded.
    ///
    /// The cost is always deducted. Returns `false` once the remaining budget has gone negative,
    /// after which nothing more may be spent this year. Nothing is deducted from a budget which
    /// has already been exhausted.
    pub fn commit(&mut self, cost: Money) -> bool {
        if self.exhausted {
            return false;
        }

        self.remaining -= cost;
        if self.remaining < Money(0.0) {
            warn!(
                "Budget exhausted: overran the annual budget by {} GBP",
                Money(0.0) - self.remaining
            );
            self.exhausted = true;
        }

        !self.exhausted
    }

    /// The budget available at the start of the year
    pub fn annual(&self) -> Money {
        self.annual
    }

    /// The budget left unspent
    pub fn remaining(&self) -> Money {
        self.remaining
    }

    /// The amount spent so far
    pub fn spent(&self) -> Money {
        self.annual - self.remaining
    }

    /// Whether the budget has run out this year
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
