//! Scroll depth milestones and per-page tracking.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A scroll depth threshold, in percent of page height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Milestone {
    Quarter = 25,
    Half = 50,
    ThreeQuarters = 75,
    Full = 100,
}

impl Milestone {
    /// All milestones in ascending order.
    pub const ALL: [Milestone; 4] = [
        Milestone::Quarter,
        Milestone::Half,
        Milestone::ThreeQuarters,
        Milestone::Full,
    ];

    pub fn percent(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Milestone {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            25 => Ok(Self::Quarter),
            50 => Ok(Self::Half),
            75 => Ok(Self::ThreeQuarters),
            100 => Ok(Self::Full),
            other => Err(format!("{} is not a scroll milestone (25, 50, 75, 100)", other)),
        }
    }
}

impl From<Milestone> for u8 {
    fn from(m: Milestone) -> Self {
        m.percent()
    }
}

/// Ascending, de-duplicated set of milestones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MilestoneSet(BTreeSet<Milestone>);

impl MilestoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a milestone, returning true if it was not present.
    pub fn insert(&mut self, milestone: Milestone) -> bool {
        self.0.insert(milestone)
    }

    pub fn contains(&self, milestone: Milestone) -> bool {
        self.0.contains(&milestone)
    }

    pub fn iter(&self) -> impl Iterator<Item = Milestone> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Milestone> for MilestoneSet {
    fn from_iter<I: IntoIterator<Item = Milestone>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Tracks scroll progress for one page in one session.
///
/// Each milestone is reported at most once, in ascending order, no matter how
/// the observed depth moves.
#[derive(Debug, Clone, Default)]
pub struct ScrollTracker {
    max_depth: u8,
    reached: MilestoneSet,
}

impl ScrollTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an observed depth and returns the milestones crossed for the
    /// first time, ascending. Depths above 100 are clamped.
    pub fn observe(&mut self, depth: u8) -> Vec<Milestone> {
        let depth = depth.min(100);
        if depth <= self.max_depth {
            return Vec::new();
        }
        self.max_depth = depth;

        Milestone::ALL
            .into_iter()
            .filter(|m| m.percent() <= depth)
            .filter(|m| self.reached.insert(*m))
            .collect()
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    pub fn milestones(&self) -> &MilestoneSet {
        &self.reached
    }
}
