//! Bounded log of RPC exchanges for the console view

use crate::domain::action::Action;
use crate::domain::types::ExchangeRecord;
use crate::infra::store::Store;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::trace;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ExchangeOutcome {
    Pending,
    Completed { elapsed_ms: u64 },
    /// An application error inside a well-formed response
    Rejected { elapsed_ms: u64, error: String },
    /// The request never produced a usable response
    Failed { elapsed_ms: u64, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeEntry {
    #[serde(flatten)]
    pub record: ExchangeRecord,
    pub outcome: ExchangeOutcome,
}

pub struct ExchangeLogStore {
    entries: VecDeque<ExchangeEntry>,
    capacity: usize,
}

impl ExchangeLogStore {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity.min(256)), capacity }
    }

    /// Oldest first
    pub fn get_exchanges(&self) -> impl Iterator<Item = &ExchangeEntry> {
        self.entries.iter()
    }

    pub fn get_exchange(&self, id: Uuid) -> Option<&ExchangeEntry> {
        self.entries.iter().find(|e| e.record.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn complete(&mut self, id: Uuid, outcome: ExchangeOutcome) -> bool {
        match self.entries.iter_mut().find(|e| e.record.id == id) {
            Some(entry) => {
                entry.outcome = outcome;
                true
            }
            // Evicted before its response arrived
            None => false,
        }
    }
}

impl Store for ExchangeLogStore {
    fn reduce(&mut self, action: &Action) -> bool {
        match action {
            Action::MakeRequest { exchange } => {
                if self.capacity == 0 {
                    return false;
                }
                while self.entries.len() >= self.capacity {
                    self.entries.pop_front();
                }
                trace!(id = %exchange.id, method = %exchange.method, "exchange_logged");
                self.entries.push_back(ExchangeEntry {
                    record: exchange.clone(),
                    outcome: ExchangeOutcome::Pending,
                });
                true
            }
            Action::ReceiveResponse { exchange_id, elapsed_ms, error } => {
                let outcome = match error {
                    Some(error) => ExchangeOutcome::Rejected { elapsed_ms: *elapsed_ms, error: error.clone() },
                    None => ExchangeOutcome::Completed { elapsed_ms: *elapsed_ms },
                };
                self.complete(*exchange_id, outcome)
            }
            Action::FailRequest { exchange_id, elapsed_ms, error } => self.complete(
                *exchange_id,
                ExchangeOutcome::Failed { elapsed_ms: *elapsed_ms, error: error.clone() },
            ),
            Action::ClearAuthorization => {
                self.entries.clear();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn exchange(method: &str) -> ExchangeRecord {
        ExchangeRecord {
            id: Uuid::new_v4(),
            method: method.to_string(),
            request: json!({"jsonrpc": "2.0", "method": method}),
            initiated: Utc::now(),
        }
    }

    #[test]
    fn test_keeps_most_recent_exchanges() {
        let mut store = ExchangeLogStore::new(2);
        for method in ["list_platforms", "list_agents", "status_agents"] {
            store.reduce(&Action::MakeRequest { exchange: exchange(method) });
        }
        let methods: Vec<_> = store.get_exchanges().map(|e| e.record.method.as_str()).collect();
        assert_eq!(methods, vec!["list_agents", "status_agents"]);
    }

    #[test]
    fn test_outcomes_are_recorded() {
        let mut store = ExchangeLogStore::new(10);
        let ok = exchange("list_platforms");
        let rejected = exchange("get_devices");
        let failed = exchange("list_agents");
        let (ok_id, rejected_id, failed_id) = (ok.id, rejected.id, failed.id);
        for exchange in [ok, rejected, failed] {
            store.reduce(&Action::MakeRequest { exchange });
        }
        assert_eq!(store.get_exchange(ok_id).unwrap().outcome, ExchangeOutcome::Pending);

        store.reduce(&Action::ReceiveResponse { exchange_id: ok_id, elapsed_ms: 12, error: None });
        store.reduce(&Action::ReceiveResponse {
            exchange_id: rejected_id,
            elapsed_ms: 5,
            error: Some("No such method".into()),
        });
        store.reduce(&Action::FailRequest { exchange_id: failed_id, elapsed_ms: 60_000, error: "timed out".into() });

        assert_eq!(store.get_exchange(ok_id).unwrap().outcome, ExchangeOutcome::Completed { elapsed_ms: 12 });
        assert!(matches!(
            store.get_exchange(rejected_id).unwrap().outcome,
            ExchangeOutcome::Rejected { elapsed_ms: 5, .. }
        ));
        assert!(matches!(
            store.get_exchange(failed_id).unwrap().outcome,
            ExchangeOutcome::Failed { elapsed_ms: 60_000, .. }
        ));

        assert!(!store.reduce(&Action::ReceiveResponse { exchange_id: Uuid::new_v4(), elapsed_ms: 1, error: None }));
        assert!(store.reduce(&Action::ClearAuthorization));
        assert!(store.is_empty());
    }
}
