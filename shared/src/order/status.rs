//! Kitchen preparation status

use serde::{Deserialize, Serialize};

/// Kitchen progress of a dine-in line
///
/// Tracked statuses move strictly forward: pending → preparing → ready → done.
/// Take-away and delivery lines are `NotTracked` and never transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PreparationStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Done,
    NotTracked,
}

/// Static description of a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDescriptor {
    /// Label shown to staff
    pub label: &'static str,
    /// Whether moving a line to this status is sent to the kitchen endpoint
    pub remote_syncable: bool,
    /// Value expected by the kitchen endpoint
    pub remote_value: Option<&'static str>,
}

impl PreparationStatus {
    /// Tracked statuses in rank order
    pub const TRACKED: [PreparationStatus; 4] = [
        PreparationStatus::Pending,
        PreparationStatus::Preparing,
        PreparationStatus::Ready,
        PreparationStatus::Done,
    ];

    /// Position in the forward order; `None` for untracked lines
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Preparing => Some(1),
            Self::Ready => Some(2),
            Self::Done => Some(3),
            Self::NotTracked => None,
        }
    }

    /// The status directly after this one
    pub fn next(&self) -> Option<PreparationStatus> {
        match self {
            Self::Pending => Some(Self::Preparing),
            Self::Preparing => Some(Self::Ready),
            Self::Ready => Some(Self::Done),
            Self::Done | Self::NotTracked => None,
        }
    }

    pub fn descriptor(&self) -> StatusDescriptor {
        match self {
            Self::Pending => StatusDescriptor {
                label: "Pending",
                remote_syncable: false,
                remote_value: None,
            },
            Self::Preparing => StatusDescriptor {
                label: "Preparing",
                remote_syncable: true,
                remote_value: Some("preparing"),
            },
            Self::Ready => StatusDescriptor {
                label: "Ready",
                remote_syncable: true,
                remote_value: Some("ready"),
            },
            Self::Done => StatusDescriptor {
                label: "Served",
                remote_syncable: true,
                remote_value: Some("done"),
            },
            Self::NotTracked => StatusDescriptor {
                label: "Not tracked",
                remote_syncable: false,
                remote_value: None,
            },
        }
    }

    /// Whether `target` is strictly ahead of this status
    pub fn can_advance_to(&self, target: PreparationStatus) -> bool {
        match (self.rank(), target.rank()) {
            (Some(current), Some(target)) => target > current,
            _ => false,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}
