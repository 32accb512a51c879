use std::io::Write;

use anyhow::{Context, Result};
use client_sdk::RecordStore;
use common::{RecordId, RecordInput};
use sync_core::{DeleteOutcome, FormField, SubmitOutcome, Synchronizer};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::render;

const HELP: &str = "\
commands:
  ls                         show the collection
  add <title> | <description> create an item (an open edit is kept)
  edit <id>                  start editing an item
  title <text>               set the form title
  desc <text>                set the form description
  submit                     save the form (update while editing, else create)
  cancel                     stop editing and clear the form
  rm <id>                    delete an item
  reload                     fetch the collection again
  help                       show this text
  quit                       leave the shell
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Noop,
    List,
    Add(RecordInput),
    Edit(RecordId),
    Set(FormField, String),
    Submit,
    Cancel,
    Remove(RecordId),
    Reload,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "" => ShellCommand::Noop,
        "ls" | "list" => ShellCommand::List,
        "add" => {
            let (title, description) = rest
                .split_once('|')
                .ok_or_else(|| "usage: add <title> | <description>".to_string())?;
            ShellCommand::Add(RecordInput::new(title.trim(), description.trim()))
        }
        "edit" => ShellCommand::Edit(parse_id(rest)?),
        "title" => ShellCommand::Set(FormField::Title, rest.to_string()),
        "desc" | "description" => ShellCommand::Set(FormField::Description, rest.to_string()),
        "submit" | "save" => ShellCommand::Submit,
        "cancel" => ShellCommand::Cancel,
        "rm" | "delete" => ShellCommand::Remove(parse_id(rest)?),
        "reload" => ShellCommand::Reload,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };

    Ok(command)
}

fn parse_id(raw: &str) -> Result<RecordId, String> {
    raw.parse::<RecordId>()
        .map_err(|_| format!("expected an item id, got '{raw}'"))
}

fn prompt<S: RecordStore>(sync: &Synchronizer<S>) -> String {
    match sync.state().editing() {
        Some(id) => format!("edit #{id}> "),
        None => "add> ".to_string(),
    }
}

/// Drives one synchronizer from line input until `quit` or end of input.
/// Write failures stay silent here; they only reach the log.
pub async fn run<S, R, W>(sync: &mut Synchronizer<S>, input: R, mut out: W) -> Result<()>
where
    S: RecordStore,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    sync.load().await;
    write!(out, "{}", render::collection(sync.state()))?;

    let mut lines = input.lines();
    loop {
        write!(out, "{}", prompt(sync))?;
        out.flush()?;

        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };

        let command = match parse(&line) {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "{message}")?;
                continue;
            }
        };

        match command {
            ShellCommand::Noop => {}
            ShellCommand::List => write!(out, "{}", render::collection(sync.state()))?,
            ShellCommand::Add(input) => {
                let outcome = sync.create(input).await;
                report(&mut out, outcome)?;
            }
            ShellCommand::Edit(id) => {
                if sync.begin_edit_id(id) {
                    let form = sync.state().form();
                    writeln!(out, "editing #{id}: {} | {}", form.title, form.description)?;
                } else {
                    writeln!(out, "no item with id {id}")?;
                }
            }
            ShellCommand::Set(field, value) => sync.set_field(field, value),
            ShellCommand::Submit => {
                let outcome = sync.submit().await;
                report(&mut out, outcome)?;
            }
            ShellCommand::Cancel => sync.cancel_edit(),
            ShellCommand::Remove(id) => {
                if sync.delete(id).await == DeleteOutcome::Deleted {
                    writeln!(out, "deleted #{id}")?;
                }
            }
            ShellCommand::Reload => {
                sync.load().await;
                write!(out, "{}", render::collection(sync.state()))?;
            }
            ShellCommand::Help => write!(out, "{HELP}")?,
            ShellCommand::Quit => break,
        }
    }

    writeln!(out)?;
    Ok(())
}

fn report<W: Write>(out: &mut W, outcome: SubmitOutcome) -> Result<()> {
    match outcome {
        SubmitOutcome::Created(record) => writeln!(out, "added {}", render::record_line(&record))?,
        SubmitOutcome::Updated(record) => {
            writeln!(out, "updated {}", render::record_line(&record))?
        }
        SubmitOutcome::Rejected => writeln!(out, "{}", render::REQUIRED_FIELDS_MESSAGE)?,
        SubmitOutcome::Stale | SubmitOutcome::Failed => {}
    }
    Ok(())
}
