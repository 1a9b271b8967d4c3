// 5.0 ledger.rs: position records keyed by (owner, id).
// keys are keccak256(owner ++ id) so they match what an on-chain
// mapping would derive. not thread safe: callers serialize mutations.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::fixed_point::{FixedPoint, MathError, ONE};
use crate::position::{Position, MAX_U120};
use crate::types::{Address, PositionId};

// Ledger errors. a failed mutation leaves the ledger untouched
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("position not found: owner {owner}, id {id}")]
    PositionNotFound { owner: Address, id: PositionId },

    #[error("position already exists: owner {owner}, id {id}")]
    PositionExists { owner: Address, id: PositionId },

    #[error("invalid position: {reason}")]
    InvalidPosition { reason: String },

    #[error("fraction must be in (0, 1]")]
    InvalidFraction,

    #[error("math error: {0}")]
    Math(#[from] MathError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionKey([u8; 32]);

impl PositionKey {
    pub fn derive(owner: Address, id: PositionId) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(owner.as_bytes());
        hasher.update(id.to_word());
        let digest = hasher.finalize();

        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

// 5.1: what an unwind took off the position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnwindResult {
    pub oi_shares_removed: FixedPoint,
    pub debt_removed: FixedPoint,
    pub remaining: Position,
}

#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: HashMap<PositionKey, Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record stored under (owner, id). A zeroed record when nothing was
    /// ever stored, which never `exists()`.
    pub fn get(&self, owner: Address, id: PositionId) -> Position {
        self.positions
            .get(&PositionKey::derive(owner, id))
            .copied()
            .unwrap_or_default()
    }

    pub fn contains(&self, owner: Address, id: PositionId) -> bool {
        self.positions.contains_key(&PositionKey::derive(owner, id))
    }

    /// Overwrites whatever is stored under (owner, id).
    pub fn set(&mut self, owner: Address, id: PositionId, position: Position) {
        let key = PositionKey::derive(owner, id);
        tracing::trace!(%owner, %id, %key, "position stored");
        self.positions.insert(key, position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Records that still exist (not liquidated, shares left).
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(|pos| pos.exists())
    }

    // 5.2: store a freshly built position. (owner, id) must never have held
    // a record, closed and liquidated ones included
    pub fn build(&mut self, owner: Address, id: PositionId, position: Position) -> Result<(), LedgerError> {
        if position.oi_shares.is_zero() {
            return Err(LedgerError::InvalidPosition {
                reason: "oi shares must be positive".to_string(),
            });
        }
        if position.liquidated {
            return Err(LedgerError::InvalidPosition {
                reason: "cannot build a liquidated position".to_string(),
            });
        }
        if position.entry_price.is_zero() {
            return Err(LedgerError::InvalidPosition {
                reason: "entry price must be positive".to_string(),
            });
        }
        if position.oi_shares > MAX_U120 || position.debt > MAX_U120 {
            return Err(LedgerError::InvalidPosition {
                reason: "oi shares or debt exceed 120 bits".to_string(),
            });
        }

        let key = PositionKey::derive(owner, id);
        if self.positions.contains_key(&key) {
            return Err(LedgerError::PositionExists { owner, id });
        }

        tracing::debug!(
            %owner,
            %id,
            side = ?position.side(),
            oi_shares = %position.oi_shares,
            debt = %position.debt,
            entry_price = %position.entry_price,
            "position built"
        );
        self.positions.insert(key, position);
        Ok(())
    }

    // 5.3: take `fraction` of shares and debt off the position. amounts
    // removed round up, so the remainder never overstates the claim
    pub fn unwind(
        &mut self,
        owner: Address,
        id: PositionId,
        fraction: FixedPoint,
    ) -> Result<UnwindResult, LedgerError> {
        if fraction.is_zero() || fraction > ONE {
            return Err(LedgerError::InvalidFraction);
        }

        let key = PositionKey::derive(owner, id);
        let position = match self.positions.get_mut(&key) {
            Some(pos) if pos.exists() => pos,
            _ => return Err(LedgerError::PositionNotFound { owner, id }),
        };

        let oi_shares_removed = position.oi_shares.mul_up(fraction)?.min(position.oi_shares);
        let debt_removed = position.debt.mul_up(fraction)?.min(position.debt);
        position.oi_shares = position.oi_shares.sub_floor(oi_shares_removed);
        position.debt = position.debt.sub_floor(debt_removed);

        tracing::debug!(
            %owner,
            %id,
            %fraction,
            oi_shares_removed = %oi_shares_removed,
            debt_removed = %debt_removed,
            "position unwound"
        );

        Ok(UnwindResult {
            oi_shares_removed,
            debt_removed,
            remaining: *position,
        })
    }

    /// Marks the position liquidated. Terminal: it can never be unwound or
    /// liquidated again, and the slot stays taken.
    pub fn liquidate(&mut self, owner: Address, id: PositionId) -> Result<Position, LedgerError> {
        let key = PositionKey::derive(owner, id);
        let position = match self.positions.get_mut(&key) {
            Some(pos) if pos.exists() => pos,
            _ => return Err(LedgerError::PositionNotFound { owner, id }),
        };

        position.liquidated = true;
        tracing::info!(%owner, %id, oi_shares = %position.oi_shares, "position liquidated");
        Ok(*position)
    }
}
