//! Stress classification states

use std::fmt;

/// Coarse stress classification derived from recent versus baseline HRV
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ClassificationState {
    #[default]
    Normal,
    Fatigued,
    Stressed,
}

impl ClassificationState {
    /// Signed level: -1 fatigued, 0 normal, 1 stressed
    pub fn level(self) -> i8 {
        match self {
            ClassificationState::Fatigued => -1,
            ClassificationState::Normal => 0,
            ClassificationState::Stressed => 1,
        }
    }

    pub fn from_level(level: i8) -> Option<Self> {
        match level {
            -1 => Some(ClassificationState::Fatigued),
            0 => Some(ClassificationState::Normal),
            1 => Some(ClassificationState::Stressed),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ClassificationState::Normal => "normal",
            ClassificationState::Fatigued => "fatigued",
            ClassificationState::Stressed => "stressed",
        }
    }
}

impl fmt::Display for ClassificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
