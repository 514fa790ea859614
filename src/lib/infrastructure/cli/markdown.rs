//! Markdown help generation

use clap::{Arg, Command};

/// Renders a markdown document describing `command` and all its subcommands.
///
/// `command` should be built (see [`Command::build`]) so that global options
/// show up on every subcommand.
pub fn render(command: &Command) -> String {
    let mut out = String::new();
    render_command(&mut out, command, command.get_name(), 1);
    out
}

fn render_command(out: &mut String, command: &Command, path: &str, level: usize) {
    out.push_str(&format!("{} {}\n\n", "#".repeat(level), path));

    if let Some(about) = command.get_long_about().or(command.get_about()) {
        out.push_str(&format!("{about}\n\n"));
    }

    if level == 1 {
        if let Some(version) = command.get_version() {
            out.push_str(&format!("Version: {version}\n\n"));
        }
    }

    let options: Vec<&Arg> = command
        .get_arguments()
        .filter(|arg| !arg.is_hide_set() && !arg.is_positional())
        .filter(|arg| !matches!(arg.get_id().as_str(), "help" | "version"))
        .collect();

    if !options.is_empty() {
        out.push_str("| Option | Default | Environment | Description |\n");
        out.push_str("| --- | --- | --- | --- |\n");

        for arg in options {
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                flag(arg),
                cell(&default(arg)),
                arg.get_env()
                    .map(|env| format!("`{}`", env.to_string_lossy()))
                    .unwrap_or_default(),
                cell(&arg.get_help().map(ToString::to_string).unwrap_or_default()),
            ));
        }

        out.push('\n');
    }

    for subcommand in command
        .get_subcommands()
        .filter(|sub| sub.get_name() != "help" && !sub.is_hide_set())
    {
        let path = format!("{path} {}", subcommand.get_name());
        render_command(out, subcommand, &path, level + 1);
    }
}

fn flag(arg: &Arg) -> String {
    let value = arg.get_action().takes_values().then(|| {
        arg.get_value_names()
            .and_then(|names| names.first())
            .map(ToString::to_string)
            .unwrap_or_else(|| arg.get_id().as_str().to_uppercase())
    });

    let mut names = Vec::new();

    if let Some(long) = arg.get_long() {
        match &value {
            Some(value) => names.push(format!("`--{long} <{value}>`")),
            None => names.push(format!("`--{long}`")),
        }
    }

    if let Some(short) = arg.get_short() {
        names.push(format!("`-{short}`"));
    }

    names.join(", ")
}

fn default(arg: &Arg) -> String {
    arg.get_default_values()
        .iter()
        .map(|value| format!("`{}`", value.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
