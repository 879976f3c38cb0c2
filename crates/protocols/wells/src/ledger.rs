//! Custody and LP ledger collaborators
//!
//! A well never moves tokens or LP shares itself. Each state-changing operation
//! produces a [`Settlement`]: the ordered list of debits, credits, mints and
//! burns the caller's collaborators must apply. Steps that take from the caller
//! run first. If any step fails, the steps already applied are reversed, so a
//! failed settlement leaves both collaborators as they were.

use std::collections::HashMap;

use basin_core::TokenId;
use thiserror::Error;

/// Moves tokens between the caller and the well
pub trait TokenCustody {
    /// Take `amount` of `token` from the caller
    fn debit(&mut self, token: &TokenId, amount: u128) -> Result<(), CollaboratorError>;

    /// Pay `amount` of `token` to the caller
    fn credit(&mut self, token: &TokenId, amount: u128) -> Result<(), CollaboratorError>;
}

/// Issues and retires LP shares for the caller
pub trait LpLedger {
    fn mint(&mut self, amount: u128) -> Result<(), CollaboratorError>;
    fn burn(&mut self, amount: u128) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("Insufficient {asset}: need {required}, have {available}")]
    InsufficientBalance {
        asset: String,
        required: u128,
        available: u128,
    },

    #[error("Balance overflow")]
    Overflow,

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("No LP ledger supplied")]
    LedgerUnavailable,
}

/// One collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementStep {
    Debit { token: TokenId, amount: u128 },
    Credit { token: TokenId, amount: u128 },
    Mint(u128),
    Burn(u128),
}

impl SettlementStep {
    fn takes_from_caller(&self) -> bool {
        matches!(self, Self::Debit { .. } | Self::Burn(_))
    }

    fn amount(&self) -> u128 {
        match self {
            Self::Debit { amount, .. } | Self::Credit { amount, .. } => *amount,
            Self::Mint(amount) | Self::Burn(amount) => *amount,
        }
    }

    fn inverse(&self) -> Self {
        match self {
            Self::Debit { token, amount } => Self::Credit {
                token: token.clone(),
                amount: *amount,
            },
            Self::Credit { token, amount } => Self::Debit {
                token: token.clone(),
                amount: *amount,
            },
            Self::Mint(amount) => Self::Burn(*amount),
            Self::Burn(amount) => Self::Mint(*amount),
        }
    }

    fn run(
        &self,
        custody: &mut dyn TokenCustody,
        ledger: &mut Option<&mut dyn LpLedger>,
    ) -> Result<(), CollaboratorError> {
        match self {
            Self::Debit { token, amount } => custody.debit(token, *amount),
            Self::Credit { token, amount } => custody.credit(token, *amount),
            Self::Mint(amount) => match ledger {
                Some(ledger) => ledger.mint(*amount),
                None => Err(CollaboratorError::LedgerUnavailable),
            },
            Self::Burn(amount) => match ledger {
                Some(ledger) => ledger.burn(*amount),
                None => Err(CollaboratorError::LedgerUnavailable),
            },
        }
    }
}

/// Collaborator calls owed by one operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settlement {
    steps: Vec<SettlementStep>,
}

impl Settlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debit(mut self, token: &TokenId, amount: u128) -> Self {
        self.steps.push(SettlementStep::Debit {
            token: token.clone(),
            amount,
        });
        self
    }

    pub fn credit(mut self, token: &TokenId, amount: u128) -> Self {
        self.steps.push(SettlementStep::Credit {
            token: token.clone(),
            amount,
        });
        self
    }

    pub fn mint(mut self, amount: u128) -> Self {
        self.steps.push(SettlementStep::Mint(amount));
        self
    }

    pub fn burn(mut self, amount: u128) -> Self {
        self.steps.push(SettlementStep::Burn(amount));
        self
    }

    /// Steps in execution order: debits and burns, then credits and mints.
    /// Zero amounts are dropped.
    pub fn ordered_steps(&self) -> Vec<&SettlementStep> {
        let (mut first, rest): (Vec<_>, Vec<_>) = self
            .steps
            .iter()
            .filter(|step| step.amount() > 0)
            .partition(|step| step.takes_from_caller());
        first.extend(rest);
        first
    }

    /// Apply every step, reversing the applied prefix on failure
    pub fn apply(
        &self,
        custody: &mut dyn TokenCustody,
        mut ledger: Option<&mut dyn LpLedger>,
    ) -> Result<(), CollaboratorError> {
        let steps = self.ordered_steps();
        for (i, step) in steps.iter().enumerate() {
            if let Err(e) = step.run(custody, &mut ledger) {
                tracing::warn!("Settlement step {:?} failed: {}, compensating {} steps", step, e, i);
                for applied in steps[..i].iter().rev() {
                    let undo = applied.inverse();
                    if let Err(undo_err) = undo.run(custody, &mut ledger) {
                        tracing::error!("Compensation {:?} failed: {}", undo, undo_err);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

/// In-memory token account
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryAccount {
    balances: HashMap<TokenId, u128>,
}

impl MemoryAccount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, token: &TokenId, amount: u128) -> Self {
        self.balances.insert(token.clone(), amount);
        self
    }

    pub fn balance(&self, token: &TokenId) -> u128 {
        self.balances.get(token).copied().unwrap_or(0)
    }
}

impl TokenCustody for MemoryAccount {
    fn debit(&mut self, token: &TokenId, amount: u128) -> Result<(), CollaboratorError> {
        let available = self.balance(token);
        if available < amount {
            return Err(CollaboratorError::InsufficientBalance {
                asset: token.to_string(),
                required: amount,
                available,
            });
        }
        self.balances.insert(token.clone(), available - amount);
        Ok(())
    }

    fn credit(&mut self, token: &TokenId, amount: u128) -> Result<(), CollaboratorError> {
        let balance = self
            .balance(token)
            .checked_add(amount)
            .ok_or(CollaboratorError::Overflow)?;
        self.balances.insert(token.clone(), balance);
        Ok(())
    }
}

/// In-memory LP balance of one holder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryLpLedger {
    balance: u128,
}

impl MemoryLpLedger {
    pub fn new(balance: u128) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> u128 {
        self.balance
    }
}

impl LpLedger for MemoryLpLedger {
    fn mint(&mut self, amount: u128) -> Result<(), CollaboratorError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(CollaboratorError::Overflow)?;
        Ok(())
    }

    fn burn(&mut self, amount: u128) -> Result<(), CollaboratorError> {
        if self.balance < amount {
            return Err(CollaboratorError::InsufficientBalance {
                asset: "LP".to_string(),
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }
}
