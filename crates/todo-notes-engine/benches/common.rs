// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_todo_list(todos: usize) -> String {
    let mut content = String::from("# Todos\n\n");
    for todo in 0..todos {
        content.push_str(&format!("- [ ] Todo {todo}\n\n"));
        content.push_str("  [metadata]: # (Tags: [work])\n");
        content.push_str(&format!("  [metadata]: # (Title: Task {todo})\n\n"));
        content.push_str("  Some notes with an ![image](img/shot.png).\n\n");
        content.push_str("  - [x] first step\n");
        content.push_str("  - [ ] second step\n");
        content.push_str("    - plain detail\n");
    }
    content
}

#[allow(dead_code)]
pub fn generate_nested_todos(depth: usize) -> String {
    let mut content = String::new();
    for level in 0..depth {
        let indent = "  ".repeat(level);
        content.push_str(&format!("{indent}- [ ] Level {level}\n"));
        content.push_str(&format!("{indent}  body text at level {level}\n"));
    }
    content
}

#[allow(dead_code)]
pub fn generate_image_body(images: usize) -> String {
    (0..images)
        .map(|i| format!("Paragraph {i} ![shot](img/shot-{i}.png) and ![remote](https://example.com/{i}.png)\n\n"))
        .collect()
}
