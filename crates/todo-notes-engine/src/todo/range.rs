use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{is_checked, is_todo};
use crate::parsing::{Flattened, LineSource, NodeId, ParsedNode};

/// Shallowest level a todo can sit at: root (0) > list (1) > item (2).
pub const DEFAULT_MIN_TODO_LEVEL: usize = 2;

/// What ends a todo's body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMode {
    /// Any outdent below the todo's level, or a sibling todo.
    Strict,
    /// Only a todo at the same or a shallower level.
    #[default]
    NextTodo,
}

impl FromStr for DetectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(DetectionMode::Strict),
            "next-todo" => Ok(DetectionMode::NextTodo),
            other => Err(format!(
                "Unknown detection mode '{other}', expected 'strict' or 'next-todo'"
            )),
        }
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionMode::Strict => write!(f, "strict"),
            DetectionMode::NextTodo => write!(f, "next-todo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionOptions {
    pub mode: DetectionMode,
    pub min_todo_level: usize,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            mode: DetectionMode::default(),
            min_todo_level: DEFAULT_MIN_TODO_LEVEL,
        }
    }
}

impl DetectionOptions {
    pub fn with_mode(mode: DetectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Line span of a todo block, 0-indexed for editor consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodoRange {
    pub start_line: usize,
    pub start_char: usize,
    pub end_line: usize,
    /// Character length of the end line.
    pub end_char: usize,
}

impl TodoRange {
    /// A header-only todo has nothing to extract.
    pub fn is_header_only(&self) -> bool {
        self.start_line == self.end_line
    }

    /// Whether the 0-indexed `line` lies in the block.
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// 0-indexed lines after the header.
    pub fn body_lines(&self) -> std::ops::RangeInclusive<usize> {
        self.start_line + 1..=self.end_line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedTodo {
    pub range: TodoRange,
    /// The todo list item on the first line of the range.
    pub header: NodeId,
    pub level: usize,
    /// True when every todo in the body is checked, or there are none.
    pub is_child_todo_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Found(DetectedTodo),
    NoEnclosingTodo,
    AlreadyCompleted,
}

impl Detection {
    pub fn found(self) -> Option<DetectedTodo> {
        match self {
            Detection::Found(todo) => Some(todo),
            _ => None,
        }
    }
}

/// Deepest level among nodes spanning the 1-indexed `target_line`, floored at `min_level`.
pub fn current_line_level(flat: Flattened<'_>, target_line: usize, min_level: usize) -> usize {
    flat.iter()
        .filter(|node| node.contains_line(target_line))
        .map(|node| node.level)
        .max()
        .unwrap_or(0)
        .max(min_level)
}

/// Finds the todo governing the 1-indexed `target_line` and the extent of its body.
pub fn detect_todo(
    flat: Flattened<'_>,
    target_line: usize,
    lines: &impl LineSource,
    options: &DetectionOptions,
) -> Detection {
    let current_level = current_line_level(flat, target_line, options.min_todo_level);

    let Some(start) = flat
        .iter()
        .filter(|node| is_todo(node) && node.level <= current_level)
        .filter(|node| node.start_line().is_some_and(|line| line <= target_line))
        .last()
    else {
        log::trace!("no todo encloses line {target_line} (level {current_level})");
        return Detection::NoEnclosingTodo;
    };

    if is_checked(start) {
        log::trace!("todo at node {} is already completed", start.id);
        return Detection::AlreadyCompleted;
    }

    let start_line = start.start_line().unwrap_or(target_line);
    let start_level = start.level;

    let terminator = flat
        .iter()
        .filter(|node| node.start_line().is_some_and(|line| line > target_line))
        .find(|node| ends_body(node, start_level, options.mode));

    // Terminators start after the target, so the range never ends before it starts
    let end_line = match terminator.and_then(|node| node.start_line()) {
        Some(line) => line - 1,
        None => lines.line_count().max(start_line),
    };

    log::trace!(
        "todo at line {start_line} (level {start_level}) ends at line {end_line} in {} mode",
        options.mode
    );

    let range = TodoRange {
        start_line: start_line - 1,
        start_char: 0,
        end_line: end_line - 1,
        end_char: lines.line_len(end_line - 1),
    };

    let is_child_todo_completed = flat
        .iter()
        .filter(|node| is_todo(node))
        .filter(|node| {
            node.start_line()
                .is_some_and(|line| line > start_line && line <= end_line)
        })
        .all(is_checked);

    Detection::Found(DetectedTodo {
        range,
        header: start.id,
        level: start_level,
        is_child_todo_completed,
    })
}

/// Range of the unchecked todo governing the 1-indexed `target_line`, if any.
pub fn detect_range(
    flat: Flattened<'_>,
    target_line: usize,
    lines: &impl LineSource,
    options: &DetectionOptions,
) -> Option<TodoRange> {
    detect_todo(flat, target_line, lines, options)
        .found()
        .map(|todo| todo.range)
}

fn ends_body(node: &ParsedNode, start_level: usize, mode: DetectionMode) -> bool {
    match mode {
        DetectionMode::Strict => {
            node.level < start_level || (is_todo(node) && node.level == start_level)
        }
        DetectionMode::NextTodo => is_todo(node) && node.level <= start_level,
    }
}
