pub mod range;

use crate::parsing::{NodeKind, ParsedNode};

pub use range::{
    DEFAULT_MIN_TODO_LEVEL, DetectedTodo, Detection, DetectionMode, DetectionOptions, TodoRange,
    current_line_level, detect_range, detect_todo,
};

/// A todo is a list item carrying a task checkbox, checked or not.
pub fn is_todo(node: &ParsedNode) -> bool {
    matches!(node.kind, NodeKind::ListItem { checked: Some(_) })
}

pub fn is_checked(node: &ParsedNode) -> bool {
    matches!(node.kind, NodeKind::ListItem { checked: Some(true) })
}
