//! Race results leaderboard
//!
//! The core never persists anything itself. A finish produces a
//! `FinishTicket`; the driver submits it to a `ResultsStore` and shows the
//! returned top ten. A failed store leaves the finish standing locally.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::sim::rules::FinishRecord;

/// Maximum number of results returned for display
pub const MAX_RESULTS: usize = 10;

/// A single leaderboard entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub sailor_name: String,
    /// Total time with penalties, seconds
    pub final_time: f64,
}

/// External results store
pub trait ResultsStore {
    fn save_result(&mut self, result: &RaceResult) -> Result<(), PersistenceError>;

    /// Best results, ascending by time, at most `MAX_RESULTS`
    fn top_ten(&self) -> Result<Vec<RaceResult>, PersistenceError>;
}

/// A finish waiting to be submitted, tagged with the race epoch it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct FinishTicket {
    pub epoch: u64,
    pub record: FinishRecord,
}

/// What became of a submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Posted {
        final_time: f64,
        top_ten: Vec<RaceResult>,
    },
    /// The store failed; the time stands but is not on the board
    LocalOnly { final_time: f64, reason: String },
    /// The race was reset after this finish
    Stale,
}

/// Submit a finish unless the race it came from has since been reset
pub fn submit(
    store: &mut impl ResultsStore,
    ticket: &FinishTicket,
    current_epoch: u64,
    sailor_name: &str,
) -> SubmissionOutcome {
    if ticket.epoch != current_epoch {
        log::warn!(
            "Dropping finish from epoch {} (race is at epoch {current_epoch})",
            ticket.epoch
        );
        return SubmissionOutcome::Stale;
    }

    let final_time = ticket.record.total;
    let result = RaceResult {
        sailor_name: sailor_name.to_string(),
        final_time,
    };
    let posted = store.save_result(&result).and_then(|()| store.top_ten());
    match posted {
        Ok(top_ten) => SubmissionOutcome::Posted {
            final_time,
            top_ten,
        },
        Err(e) => {
            log::warn!("Finish recorded locally, leaderboard unavailable: {e}");
            SubmissionOutcome::LocalOnly {
                final_time,
                reason: e.to_string(),
            }
        }
    }
}

/// In-memory leaderboard, optionally backed by a JSON file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Leaderboard {
    /// Ascending by final time
    pub entries: Vec<RaceResult>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a time would make the board
    pub fn qualifies(&self, final_time: f64) -> bool {
        if !final_time.is_finite() || final_time < 0.0 {
            return false;
        }
        if self.entries.len() < MAX_RESULTS {
            return true;
        }
        self.entries.last().map(|e| final_time < e.final_time).unwrap_or(true)
    }

    /// Get the rank a time would achieve (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, final_time: f64) -> Option<usize> {
        if !self.qualifies(final_time) {
            return None;
        }
        let rank = self.entries.iter().position(|e| final_time < e.final_time);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Insert a result, returning its rank (1-indexed) or None if it didn't qualify
    pub fn add_result(&mut self, result: RaceResult) -> Option<usize> {
        let rank = self.potential_rank(result.final_time)?;
        self.entries.insert(rank - 1, result);
        self.entries.truncate(MAX_RESULTS);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fastest time (if any)
    pub fn best_time(&self) -> Option<f64> {
        self.entries.first().map(|e| e.final_time)
    }

    /// Load from a JSON file; a missing or corrupt file starts fresh
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let Ok(json) = std::fs::read_to_string(path) else {
            log::info!("No leaderboard at {}, starting fresh", path.display());
            return Self::new();
        };
        match serde_json::from_str::<Leaderboard>(&json) {
            Ok(mut board) => {
                board.entries.retain(|e| e.final_time.is_finite());
                board
                    .entries
                    .sort_by(|a, b| a.final_time.total_cmp(&b.final_time));
                board.entries.truncate(MAX_RESULTS);
                log::info!("Loaded {} results", board.entries.len());
                board
            }
            Err(e) => {
                log::warn!("Ignoring unreadable leaderboard {}: {e}", path.display());
                Self::new()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PersistenceError::Rejected(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| PersistenceError::Unavailable(format!("{}: {e}", path.display())))?;
        log::info!("Leaderboard saved ({} entries)", self.entries.len());
        Ok(())
    }
}

impl ResultsStore for Leaderboard {
    fn save_result(&mut self, result: &RaceResult) -> Result<(), PersistenceError> {
        if !result.final_time.is_finite() || result.final_time < 0.0 {
            return Err(PersistenceError::Rejected(format!(
                "final time {} is not a valid time",
                result.final_time
            )));
        }
        // Slower than the whole board: accepted, just not shown
        self.add_result(result.clone());
        Ok(())
    }

    fn top_ten(&self) -> Result<Vec<RaceResult>, PersistenceError> {
        Ok(self.entries.iter().take(MAX_RESULTS).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, time: f64) -> RaceResult {
        RaceResult {
            sailor_name: name.to_string(),
            final_time: time,
        }
    }

    fn ticket(epoch: u64, total: f64) -> FinishTicket {
        FinishTicket {
            epoch,
            record: FinishRecord {
                elapsed: total,
                ocs_penalty: 0.0,
                finish_mark_penalty: 0.0,
                rounding_penalty: 0.0,
                rounding_touches: 0,
                total,
            },
        }
    }

    struct OfflineStore;

    impl ResultsStore for OfflineStore {
        fn save_result(&mut self, _: &RaceResult) -> Result<(), PersistenceError> {
            Err(PersistenceError::Unavailable("offline".to_string()))
        }

        fn top_ten(&self) -> Result<Vec<RaceResult>, PersistenceError> {
            Err(PersistenceError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn test_board_orders_ascending_and_caps() {
        let mut board = Leaderboard::new();
        for i in 0..15 {
            board.add_result(result("s", 500.0 - i as f64 * 10.0));
        }
        let top = board.top_ten().unwrap();
        assert_eq!(top.len(), MAX_RESULTS);
        assert_eq!(top[0].final_time, 360.0);
        assert!(top.windows(2).all(|w| w[0].final_time <= w[1].final_time));
    }

    #[test]
    fn test_rank_and_qualification() {
        let mut board = Leaderboard::new();
        assert_eq!(board.add_result(result("a", 300.0)), Some(1));
        assert_eq!(board.add_result(result("b", 200.0)), Some(1));
        assert_eq!(board.add_result(result("c", 250.0)), Some(2));
        assert_eq!(board.potential_rank(400.0), Some(4));
        assert!(!board.qualifies(f64::NAN));
        assert_eq!(board.best_time(), Some(200.0));
    }

    #[test]
    fn test_full_board_rejects_slow_time() {
        let mut board = Leaderboard::new();
        for i in 0..MAX_RESULTS {
            board.add_result(result("s", 100.0 + i as f64));
        }
        assert!(!board.qualifies(500.0));
        assert_eq!(board.add_result(result("slow", 500.0)), None);
        assert!(board.qualifies(100.5));
    }

    #[test]
    fn test_submit_posts_and_returns_top_ten() {
        let mut board = Leaderboard::new();
        board.add_result(result("rival", 410.0));
        match submit(&mut board, &ticket(3, 400.0), 3, "Sailor") {
            SubmissionOutcome::Posted { final_time, top_ten } => {
                assert_eq!(final_time, 400.0);
                assert_eq!(top_ten[0], result("Sailor", 400.0));
                assert_eq!(top_ten.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_store_failure_keeps_local_time() {
        let outcome = submit(&mut OfflineStore, &ticket(0, 321.5), 0, "Sailor");
        assert!(matches!(
            outcome,
            SubmissionOutcome::LocalOnly { final_time, .. } if final_time == 321.5
        ));
    }

    #[test]
    fn test_stale_ticket_is_refused() {
        let mut board = Leaderboard::new();
        assert_eq!(submit(&mut board, &ticket(1, 300.0), 2, "Sailor"), SubmissionOutcome::Stale);
        assert!(board.is_empty());
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("ilca-sim-board-{}.json", std::process::id()));
        let mut board = Leaderboard::new();
        board.add_result(result("a", 250.0));
        board.add_result(result("b", 200.0));
        board.save(&path).unwrap();
        let loaded = Leaderboard::load(&path);
        assert_eq!(loaded.entries, board.entries);
        let _ = std::fs::remove_file(&path);
        assert!(Leaderboard::load(&path).is_empty());
    }
}
