//! Practice progress: the critique recorder seam and a local RON store.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use pt_core::{Difficulty, Grade};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most recent critiques kept in history
pub const HISTORY_LIMIT: usize = 50;

const SECONDS_PER_DAY: u64 = 86_400;
const STREAK_BONUS_PER_DAY: u32 = 5;
const MAX_STREAK_BONUS: u32 = 50;

#[derive(Debug, Clone, Error)]
pub enum ProgressError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}

/// One finished critique handed to the recorder
#[derive(Debug, Clone, PartialEq)]
pub struct CritiqueRecord {
    /// PNG data URI of the drawing thumbnail
    pub thumbnail: String,
    pub grade: Grade,
    pub feedback: String,
    pub difficulty: Difficulty,
}

/// What the recorder awarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueReward {
    pub xp_gained: u32,
    pub total_critiques: u32,
}

/// Receives finished critiques and supplies the practice difficulty.
pub trait ProgressRecorder: Send {
    fn record_critique(&mut self, record: CritiqueRecord) -> Result<CritiqueReward, ProgressError>;

    fn difficulty(&self) -> Difficulty;
}

/// Stored history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: u64,
    pub grade: Grade,
    pub feedback: String,
    pub difficulty: Difficulty,
    pub xp: u32,
    pub thumbnail: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressData {
    pub total_xp: u32,
    pub total_critiques: u32,
    pub streak_days: u32,
    /// Day number (days since the Unix epoch) of the last critique
    pub last_practice_day: Option<u64>,
    pub difficulty: Difficulty,
    pub history: VecDeque<HistoryEntry>,
}

/// Base XP for a grade before multipliers
pub fn base_xp(grade: Grade) -> u32 {
    match grade {
        Grade::A => 100,
        Grade::B => 75,
        Grade::C => 50,
        Grade::D => 30,
        Grade::F => 15,
    }
}

fn difficulty_percent(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Beginner => 100,
        Difficulty::Intermediate => 125,
        Difficulty::Advanced => 150,
    }
}

/// [`ProgressRecorder`] persisted as RON, or kept in memory
pub struct LocalProgress {
    data: ProgressData,
    path: Option<PathBuf>,
}

impl LocalProgress {
    pub fn in_memory(difficulty: Difficulty) -> Self {
        Self {
            data: ProgressData {
                difficulty,
                ..Default::default()
            },
            path: None,
        }
    }

    /// Load from `path`; a missing or unreadable file starts fresh.
    pub fn load(path: PathBuf, default_difficulty: Difficulty) -> Self {
        let data = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| match ron::from_str::<ProgressData>(&content) {
                Ok(data) => {
                    tracing::info!("Loaded progress from {:?}", path);
                    Some(data)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse progress file: {}", e);
                    None
                }
            })
            .unwrap_or_else(|| ProgressData {
                difficulty: default_difficulty,
                ..Default::default()
            });
        Self {
            data,
            path: Some(path),
        }
    }

    pub fn data(&self) -> &ProgressData {
        &self.data
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.data.difficulty = difficulty;
    }

    pub fn save(&self) -> Result<(), ProgressError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProgressError::Io(e.to_string()))?;
        }
        let content = ron::ser::to_string_pretty(&self.data, ron::ser::PrettyConfig::default())
            .map_err(|e| ProgressError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ProgressError::Io(e.to_string()))?;
        tracing::debug!("Saved progress to {:?}", path);
        Ok(())
    }

    /// Record with an explicit clock.
    pub fn record_at(&mut self, record: CritiqueRecord, now: SystemTime) -> CritiqueReward {
        let timestamp = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default();
        let day = timestamp / SECONDS_PER_DAY;

        self.data.streak_days = match self.data.last_practice_day {
            Some(last) if last == day => self.data.streak_days.max(1),
            Some(last) if last + 1 == day => self.data.streak_days + 1,
            _ => 1,
        };
        self.data.last_practice_day = Some(day);

        let streak_bonus = ((self.data.streak_days - 1) * STREAK_BONUS_PER_DAY).min(MAX_STREAK_BONUS);
        let xp = base_xp(record.grade) * difficulty_percent(record.difficulty) / 100 + streak_bonus;

        self.data.total_xp += xp;
        self.data.total_critiques += 1;
        self.data.history.push_front(HistoryEntry {
            timestamp,
            grade: record.grade,
            feedback: record.feedback,
            difficulty: record.difficulty,
            xp,
            thumbnail: record.thumbnail,
        });
        self.data.history.truncate(HISTORY_LIMIT);

        CritiqueReward {
            xp_gained: xp,
            total_critiques: self.data.total_critiques,
        }
    }
}

impl ProgressRecorder for LocalProgress {
    fn record_critique(&mut self, record: CritiqueRecord) -> Result<CritiqueReward, ProgressError> {
        let reward = self.record_at(record, SystemTime::now());
        self.save()?;
        Ok(reward)
    }

    fn difficulty(&self) -> Difficulty {
        self.data.difficulty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(grade: Grade) -> CritiqueRecord {
        CritiqueRecord {
            thumbnail: "data:image/png;base64,AA==".to_string(),
            grade,
            feedback: "fine".to_string(),
            difficulty: Difficulty::Beginner,
        }
    }

    fn day(n: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(n * SECONDS_PER_DAY + 3600)
    }

    #[test]
    fn test_xp_and_totals() {
        let mut progress = LocalProgress::in_memory(Difficulty::Beginner);
        let reward = progress.record_at(record(Grade::B), day(100));
        assert_eq!(reward, CritiqueReward { xp_gained: 75, total_critiques: 1 });

        let mut advanced = record(Grade::A);
        advanced.difficulty = Difficulty::Advanced;
        let reward = progress.record_at(advanced, day(100));
        assert_eq!(reward.xp_gained, 150);
        assert_eq!(progress.data().total_xp, 225);
        assert_eq!(progress.data().history.len(), 2);
        assert_eq!(progress.data().history[0].grade, Grade::A);
    }

    #[test]
    fn test_streak_counts_consecutive_days() {
        let mut progress = LocalProgress::in_memory(Difficulty::Beginner);
        progress.record_at(record(Grade::C), day(10));
        progress.record_at(record(Grade::C), day(10));
        assert_eq!(progress.data().streak_days, 1);
        let reward = progress.record_at(record(Grade::C), day(11));
        assert_eq!(progress.data().streak_days, 2);
        assert_eq!(reward.xp_gained, 50 + STREAK_BONUS_PER_DAY);
        progress.record_at(record(Grade::C), day(14));
        assert_eq!(progress.data().streak_days, 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut progress = LocalProgress::in_memory(Difficulty::Beginner);
        for _ in 0..HISTORY_LIMIT + 5 {
            progress.record_at(record(Grade::F), day(1));
        }
        assert_eq!(progress.data().history.len(), HISTORY_LIMIT);
        assert_eq!(progress.data().total_critiques as usize, HISTORY_LIMIT + 5);
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.ron");
        let mut progress = LocalProgress::load(path.clone(), Difficulty::Intermediate);
        assert_eq!(progress.difficulty(), Difficulty::Intermediate);
        progress.record_critique(record(Grade::A)).unwrap();

        let reloaded = LocalProgress::load(path, Difficulty::Beginner);
        assert_eq!(reloaded.data(), progress.data());
        assert_eq!(reloaded.difficulty(), Difficulty::Intermediate);
    }
}
