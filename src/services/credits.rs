// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credit metering for free-plan users.
//!
//! Every AI feature goes through [`FeatureGate::try_consume`] before the
//! oracle is called. The returned permit is committed only once the call has
//! produced a usable result, so failed generations never cost credits.
//! While a call is in flight its cost is held against the balance, so
//! concurrent calls to different features cannot spend the same credits.

use serde::Serialize;
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::Plan;

/// Credits granted when a free-plan profile is created.
pub const STARTING_CREDITS: u32 = 7;

/// Credit-metered features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Scan,
    Calculator,
    Recipe,
    ChatTurn,
    WeeklyPlan,
    WorkoutPlan,
}

impl Feature {
    pub const fn cost(self) -> u32 {
        match self {
            Feature::Scan | Feature::Calculator | Feature::Recipe | Feature::ChatTurn => 1,
            Feature::WeeklyPlan | Feature::WorkoutPlan => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Scan => "scan",
            Feature::Calculator => "calculator",
            Feature::Recipe => "recipe",
            Feature::ChatTurn => "chat",
            Feature::WeeklyPlan => "weekly plan",
            Feature::WorkoutPlan => "workout plan",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credit balance plus the plan that decides whether it is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditLedger {
    plan: Plan,
    balance: u32,
}

impl CreditLedger {
    pub fn new(plan: Plan, balance: u32) -> Self {
        Self { plan, balance }
    }

    pub fn plan(&self) -> Plan {
        self.plan
    }

    pub fn balance(&self) -> u32 {
        self.balance
    }

    pub fn set_plan(&mut self, plan: Plan) {
        self.plan = plan;
    }

    /// Deduct `cost`, clamping at zero. Premium plans are never charged.
    pub fn consume(&mut self, cost: u32) {
        if self.plan == Plan::Free {
            self.balance = self.balance.saturating_sub(cost);
        }
    }

    /// Balance left once `held` credits are set aside for in-flight calls.
    pub fn available(&self, held: u32) -> u32 {
        self.balance.saturating_sub(held)
    }

    pub fn has_sufficient(&self, cost: u32, held: u32) -> bool {
        self.plan == Plan::Premium || self.available(held) >= cost
    }
}

/// Authorization to run one feature call. Charges nothing unless committed.
#[derive(Debug)]
#[must_use = "a permit must be committed after a successful call to charge credits"]
pub struct CreditPermit {
    feature: Feature,
    hold: u32,
}

impl CreditPermit {
    pub fn feature(&self) -> Feature {
        self.feature
    }

    /// Credits to hold while the call runs. Zero on the premium plan.
    pub fn hold(&self) -> u32 {
        self.hold
    }

    /// Charge the feature's cost against the ledger and return the new balance.
    pub fn commit(self, ledger: &mut CreditLedger) -> u32 {
        ledger.consume(self.feature.cost());
        ledger.balance()
    }
}

/// Outcome of a gate check.
#[derive(Debug)]
pub enum GateDecision {
    Allowed(CreditPermit),
    Denied { required: u32, balance: u32 },
}

/// Single entry point for credit gating.
pub struct FeatureGate;

impl FeatureGate {
    /// Check `feature` against the ledger, counting `held` credits as spent.
    pub fn try_consume(feature: Feature, ledger: &CreditLedger, held: u32) -> GateDecision {
        let required = feature.cost();
        if !ledger.has_sufficient(required, held) {
            return GateDecision::Denied {
                required,
                balance: ledger.available(held),
            };
        }

        let hold = match ledger.plan() {
            Plan::Free => required,
            Plan::Premium => 0,
        };
        GateDecision::Allowed(CreditPermit { feature, hold })
    }
}
