use serde::{Deserialize, Serialize};

use crate::surface::{NodeId, Point};

/// Pointer input as seen by a mounted scene.
///
/// Mouse and touch front ends both map onto these: a touch start/end becomes
/// `Down`/`Up`, a long-press drag becomes `DragStart`/`Drop`/`DragEnd`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PointerEvent {
    Down { target: Option<NodeId>, at: Point },
    Move { at: Point },
    Up { target: Option<NodeId>, at: Point },
    Click { target: NodeId },
    /// The pointer left the play area.
    Leave,
    DragStart { target: NodeId },
    Drop { target: NodeId },
    DragEnd,
}

impl PointerEvent {
    pub fn target(&self) -> Option<NodeId> {
        match *self {
            PointerEvent::Down { target, .. } | PointerEvent::Up { target, .. } => target,
            PointerEvent::Click { target }
            | PointerEvent::DragStart { target }
            | PointerEvent::Drop { target } => Some(target),
            PointerEvent::Move { .. } | PointerEvent::Leave | PointerEvent::DragEnd => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Key {
    Enter,
    Backspace,
    Char(char),
}
