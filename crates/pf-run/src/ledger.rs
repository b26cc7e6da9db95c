// ledger.rs — CreditLedger: the gate every prompt passes before any model call.
//
// Check and deduct are one operation so two concurrent prompts from the same
// user can never both spend the last credit.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::RunError;

pub trait CreditLedger: Send + Sync {
    /// Deduct `amount` if the balance covers it. Returns false (and deducts
    /// nothing) otherwise.
    fn check_and_deduct(&self, user_id: &str, amount: u64) -> Result<bool, RunError>;

    fn balance(&self, user_id: &str) -> Result<u64, RunError>;

    /// Add credits. Returns the new balance.
    fn grant(&self, user_id: &str, amount: u64) -> Result<u64, RunError>;
}

fn deduct(balances: &mut BTreeMap<String, u64>, user_id: &str, amount: u64) -> bool {
    let balance = balances.get(user_id).copied().unwrap_or(0);
    match balance.checked_sub(amount) {
        Some(rest) => {
            balances.insert(user_id.to_string(), rest);
            true
        }
        None => false,
    }
}

fn add(balances: &mut BTreeMap<String, u64>, user_id: &str, amount: u64) -> u64 {
    let entry = balances.entry(user_id.to_string()).or_insert(0);
    *entry = entry.saturating_add(amount);
    *entry
}

/// In-memory ledger.
#[derive(Default)]
pub struct MemoryCreditLedger {
    balances: Mutex<BTreeMap<String, u64>>,
}

impl MemoryCreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a balance (builder pattern).
    pub fn with_balance(self, user_id: impl Into<String>, amount: u64) -> Self {
        if let Ok(mut balances) = self.balances.lock() {
            balances.insert(user_id.into(), amount);
        }
        self
    }
}

impl CreditLedger for MemoryCreditLedger {
    fn check_and_deduct(&self, user_id: &str, amount: u64) -> Result<bool, RunError> {
        let mut balances = self
            .balances
            .lock()
            .map_err(|e| RunError::Ledger(e.to_string()))?;
        Ok(deduct(&mut balances, user_id, amount))
    }

    fn balance(&self, user_id: &str) -> Result<u64, RunError> {
        let balances = self
            .balances
            .lock()
            .map_err(|e| RunError::Ledger(e.to_string()))?;
        Ok(balances.get(user_id).copied().unwrap_or(0))
    }

    fn grant(&self, user_id: &str, amount: u64) -> Result<u64, RunError> {
        let mut balances = self
            .balances
            .lock()
            .map_err(|e| RunError::Ledger(e.to_string()))?;
        Ok(add(&mut balances, user_id, amount))
    }
}

/// Balances kept in a JSON object `{ "<user>": <credits> }`.
///
/// Every operation re-reads the file under a process-local lock, so a CLI
/// invocation always sees the balances the previous one wrote.
pub struct JsonCreditLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonCreditLedger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<BTreeMap<String, u64>, RunError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(&self.path).map_err(|source| RunError::IoError {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    fn write(&self, balances: &BTreeMap<String, u64>) -> Result<(), RunError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| RunError::IoError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(balances)?;
        fs::write(&self.path, json).map_err(|source| RunError::IoError {
            path: self.path.clone(),
            source,
        })
    }

    fn with_balances<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, u64>) -> T,
    ) -> Result<T, RunError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| RunError::Ledger(e.to_string()))?;
        let mut balances = self.read()?;
        let out = f(&mut balances);
        self.write(&balances)?;
        Ok(out)
    }
}

impl CreditLedger for JsonCreditLedger {
    fn check_and_deduct(&self, user_id: &str, amount: u64) -> Result<bool, RunError> {
        self.with_balances(|b| deduct(b, user_id, amount))
    }

    fn balance(&self, user_id: &str) -> Result<u64, RunError> {
        Ok(self.read()?.get(user_id).copied().unwrap_or(0))
    }

    fn grant(&self, user_id: &str, amount: u64) -> Result<u64, RunError> {
        self.with_balances(|b| add(b, user_id, amount))
    }
}
