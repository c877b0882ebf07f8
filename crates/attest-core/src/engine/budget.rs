//! Time and token budget enforcement.
//!
//! Two independent envelopes, each possibly constrained at several
//! hierarchical scopes (suite, class, method). The effective limit per
//! envelope is the minimum across scopes, and the envelope that crossed its
//! limit first wins when both are exhausted; ties go to the time envelope.
//! Not thread-safe; one tracker per run.

use crate::model::TerminationReason;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetScope {
    Suite,
    Class,
    Method,
}

impl BudgetScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suite => "suite",
            Self::Class => "class",
            Self::Method => "method",
        }
    }
}

/// One scope's contribution to the envelopes.
#[derive(Debug, Clone, Copy)]
pub struct BudgetLimit {
    pub scope: BudgetScope,
    pub time_budget_ms: Option<u64>,
    pub token_budget: Option<u64>,
}

/// Which envelope ran out, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetExhaustion {
    pub reason: TerminationReason,
    pub scope: BudgetScope,
    pub detail: String,
}

#[derive(Debug)]
pub struct BudgetTracker {
    limits: Vec<BudgetLimit>,
    started: Instant,
    tokens_used: u64,
    /// Instant at which the token envelope was first crossed.
    token_crossed_at: Option<Instant>,
}

impl BudgetTracker {
    pub fn new(limits: Vec<BudgetLimit>) -> Self {
        Self {
            limits,
            started: Instant::now(),
            tokens_used: 0,
            token_crossed_at: None,
        }
    }

    /// A method-scope-only tracker, the common case for a single run.
    pub fn single(time_budget_ms: Option<u64>, token_budget: Option<u64>) -> Self {
        Self::new(vec![BudgetLimit {
            scope: BudgetScope::Method,
            time_budget_ms,
            token_budget,
        }])
    }

    pub fn charge_tokens(&mut self, tokens: u64) {
        self.tokens_used += tokens;
        if self.token_crossed_at.is_none() {
            if let Some((limit, _)) = self.effective_token_budget() {
                if self.tokens_used > limit {
                    self.token_crossed_at = Some(Instant::now());
                }
            }
        }
    }

    pub fn tokens_used(&self) -> u64 {
        self.tokens_used
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
    }

    /// Tightest time limit across scopes, with the scope that imposes it.
    pub fn effective_time_budget_ms(&self) -> Option<(u64, BudgetScope)> {
        self.limits
            .iter()
            .filter_map(|l| l.time_budget_ms.map(|ms| (ms, l.scope)))
            .min_by_key(|(ms, _)| *ms)
    }

    /// Tightest token limit across scopes, with the scope that imposes it.
    pub fn effective_token_budget(&self) -> Option<(u64, BudgetScope)> {
        self.limits
            .iter()
            .filter_map(|l| l.token_budget.map(|t| (t, l.scope)))
            .min_by_key(|(t, _)| *t)
    }

    /// Exhaustion check. When both envelopes have crossed, the one that
    /// crossed earlier is reported; the time envelope's crossing instant is
    /// known exactly as start + limit.
    pub fn check(&self) -> Option<BudgetExhaustion> {
        let now = Instant::now();

        let time_cross = self.effective_time_budget_ms().and_then(|(ms, scope)| {
            let deadline = self.started + Duration::from_millis(ms);
            (now >= deadline).then_some((deadline, ms, scope))
        });
        let token_cross = self
            .token_crossed_at
            .and_then(|at| self.effective_token_budget().map(|(t, scope)| (at, t, scope)));

        match (time_cross, token_cross) {
            (None, None) => None,
            (Some((_, ms, scope)), None) => Some(self.time_exhaustion(ms, scope)),
            (None, Some((_, limit, scope))) => Some(self.token_exhaustion(limit, scope)),
            (Some((time_at, ms, time_scope)), Some((token_at, limit, token_scope))) => {
                if token_at < time_at {
                    Some(self.token_exhaustion(limit, token_scope))
                } else {
                    Some(self.time_exhaustion(ms, time_scope))
                }
            }
        }
    }

    fn time_exhaustion(&self, limit_ms: u64, scope: BudgetScope) -> BudgetExhaustion {
        BudgetExhaustion {
            reason: TerminationReason::TimeBudget,
            scope,
            detail: format!(
                "time budget of {limit_ms} ms ({} scope) exhausted after {} ms",
                scope.as_str(),
                self.elapsed_ms()
            ),
        }
    }

    fn token_exhaustion(&self, limit: u64, scope: BudgetScope) -> BudgetExhaustion {
        BudgetExhaustion {
            reason: TerminationReason::TokenBudget,
            scope,
            detail: format!(
                "token budget of {limit} ({} scope) exhausted after {} tokens",
                scope.as_str(),
                self.tokens_used
            ),
        }
    }
}
