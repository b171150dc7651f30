use crate::metadata::keys;

/// The marker that opens a new, unchecked todo.
pub const TODO_MARKER: &str = "- [ ] ";

/// Text inserted by "add todo" at the cursor on `current_line`.
///
/// The header itself starts at the cursor; metadata lines are indented one unit
/// deeper than the current line so they belong to the new item, and the text
/// ends on an indented empty line ready for the body.
pub fn todo_template(current_line: &str, indent_unit: &str, created_date: &str, eol: &str) -> String {
    let unit_char = indent_unit.chars().next().unwrap_or(' ');
    let indent = format!(
        "{}{indent_unit}",
        unit_char.to_string().repeat(leading_indent(current_line, unit_char))
    );

    let entries = [
        format!("{}: []", keys::TAGS),
        format!("{}: ", keys::FOLDER_PATH),
        format!("{}: ", keys::TITLE),
        format!("{}: ", keys::FILE_NAME),
        format!("{}: ", keys::APPEND_MODE),
        format!("{}: \"{created_date}\"", keys::CREATED_DATE),
    ];

    let mut out = format!("{TODO_MARKER}{eol}{eol}");
    for entry in entries {
        out.push_str(&format!("{indent}[metadata]: # ({entry}){eol}"));
    }
    out.push_str(&indent);
    out
}

pub fn todo_template_without_metadata() -> &'static str {
    TODO_MARKER
}

/// Number of leading `indent_char` characters in `line`.
pub fn leading_indent(line: &str, indent_char: char) -> usize {
    line.chars().take_while(|&c| c == indent_char).count()
}
