//! Binary snapshots of a ledger's configuration and state.
//!
//! Snapshots use bincode's standard configuration. The byte layout is an
//! implementation detail and may change between versions.

use std::fs;
use std::path::Path;

use pillar_core::config::LedgerConfig;
use pillar_core::error::{LedgerError, SnapshotError};
use pillar_core::traits::{Clock, ValueTransfer};

use crate::ledger::Ledger;
use crate::state::LedgerState;

#[derive(Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct LedgerSnapshot {
    pub config: LedgerConfig,
    pub state: LedgerState,
}

impl LedgerSnapshot {
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let (snapshot, read): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| SnapshotError::Decode(e.to_string()))?;
        if read != bytes.len() {
            return Err(SnapshotError::TrailingBytes(bytes.len() - read));
        }
        snapshot.config.validate()?;
        Ok(snapshot)
    }

    /// Write to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let bytes = self.encode()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = fs::read(path)?;
        Self::decode(&bytes)
    }
}

impl<T: ValueTransfer, C: Clock> Ledger<T, C> {
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            config: self.config().clone(),
            state: self.state().clone(),
        }
    }

    /// Rebuild a ledger from a snapshot with fresh collaborators.
    pub fn restore(snapshot: LedgerSnapshot, transfer: T, time: C) -> Result<Self, LedgerError> {
        Ledger::from_parts(snapshot.config, snapshot.state, transfer, time)
    }
}
