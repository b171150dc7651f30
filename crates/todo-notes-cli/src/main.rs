mod commands;
mod notes;

use std::{env, path::PathBuf, process};
use todo_notes_config::Config;

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Complete {
        file: PathBuf,
        line: usize,
        dry_run: bool,
    },
    Add {
        file: PathBuf,
        line: usize,
    },
    Range {
        file: PathBuf,
        line: usize,
    },
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {program} complete [--dry-run] <file> <line>\n       \
         {program} add <file> <line>\n       \
         {program} range <file> <line>"
    )
}

fn parse_line(value: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .map_err(|_| format!("Invalid line number '{value}'"))
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some(name) = args.get(1) else {
        return Err("Missing command".to_string());
    };

    let mut dry_run = false;
    let mut positional = Vec::new();
    for arg in &args[2..] {
        match arg.as_str() {
            "--dry-run" | "-n" => dry_run = true,
            flag if flag.starts_with('-') => return Err(format!("Unknown option '{flag}'")),
            _ => positional.push(arg.as_str()),
        }
    }

    let [file, line] = positional[..] else {
        return Err(format!("'{name}' expects <file> <line>"));
    };
    let file = PathBuf::from(file);
    let line = parse_line(line)?;

    if dry_run && name != "complete" {
        return Err("'--dry-run' only applies to 'complete'".to_string());
    }

    match name.as_str() {
        "complete" => Ok(Command::Complete {
            file,
            line,
            dry_run,
        }),
        "add" => Ok(Command::Add { file, line }),
        "range" => Ok(Command::Range { file, line }),
        other => Err(format!("Unknown command '{other}'")),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("todo-notes");

    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("Error: {message}");
            eprintln!("{}", usage(program));
            process::exit(1);
        }
    };

    let config = match Config::load() {
        Ok(Some(config)) => config,
        Ok(None) => {
            log::debug!(
                "no config file at {}, using defaults",
                Config::config_path().display()
            );
            Config::default()
        }
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let result = match &command {
        Command::Complete {
            file,
            line,
            dry_run,
        } => commands::complete(&config, file, *line, *dry_run),
        Command::Add { file, line } => commands::add(&config, file, *line),
        Command::Range { file, line } => commands::range(&config, file, *line),
    };

    match result {
        Ok(message) => println!("{message}"),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}
