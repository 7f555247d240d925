use std::fmt::Write as _;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use time::{OffsetDateTime, UtcOffset};

use crate::models::Message;
use crate::prefs::{PreferenceStore, Selection, SelectionPrefs};
use crate::timeline::{
    format_entry, format_relative, format_timestamp, insert_day_dividers, LabelMode,
};

#[derive(Args, Debug, Clone)]
pub struct TimelineArgs {
    /// JSON file holding an array of messages sorted by timestamp (stdin if omitted or "-")
    #[arg()]
    pub path: Option<PathBuf>,
    /// Viewer offset such as +10:00, UTC or local (defaults to the config value)
    #[arg(long, allow_hyphen_values = true)]
    pub offset: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FormatArgs {
    /// ISO-8601 timestamp with offset
    #[arg()]
    pub timestamp: String,
    /// Use the long day-divider label
    #[arg(long, conflicts_with = "relative")]
    pub divider: bool,
    /// Use a short "how long ago" label
    #[arg(long)]
    pub relative: bool,
    /// Viewer offset such as +10:00, UTC or local (defaults to the config value)
    #[arg(long, allow_hyphen_values = true)]
    pub offset: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SelectCommand {
    /// Print the remembered space and zone
    Show,
    /// Remember a space (forget it when ID is omitted)
    Space {
        id: Option<String>,
    },
    /// Remember a zone (forget it when ID is omitted)
    Zone {
        id: Option<String>,
    },
    /// Forget both space and zone
    Clear,
}

pub fn print_timeline(args: &TimelineArgs, offset: UtcOffset) -> Result<()> {
    let raw = match args.path.as_ref().filter(|p| p.as_os_str() != "-") {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading messages from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading messages from stdin")?;
            buf
        }
    };
    let messages = load_messages(&raw)?;
    print!("{}", render_timeline(messages, offset));
    Ok(())
}

pub fn print_label(args: &FormatArgs, offset: UtcOffset) -> Result<()> {
    let label = if args.relative {
        format_relative(&args.timestamp, OffsetDateTime::now_utc().to_offset(offset))
    } else if args.divider {
        format_timestamp(&args.timestamp, LabelMode::Divider, offset)
    } else {
        format_timestamp(&args.timestamp, LabelMode::Message, offset)
    };
    println!("{label}");
    Ok(())
}

pub fn handle_select<S: PreferenceStore>(
    prefs: &SelectionPrefs<S>,
    command: SelectCommand,
) -> Result<()> {
    match command {
        SelectCommand::Show => {}
        SelectCommand::Space { id } => prefs
            .set_space(id.as_deref())
            .context("saving selected space")?,
        SelectCommand::Zone { id } => prefs
            .set_zone(id.as_deref())
            .context("saving selected zone")?,
        SelectCommand::Clear => prefs.clear().context("clearing selection")?,
    }
    print!("{}", render_selection(&prefs.selection()));
    Ok(())
}

fn load_messages(raw: &str) -> Result<Vec<Message>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).context("parsing messages (expected a JSON array)")
}

fn render_timeline(messages: Vec<Message>, offset: UtcOffset) -> String {
    let mut out = String::new();
    for record in insert_day_dividers(messages, offset) {
        let label = format_entry(&record, offset);
        if record.is_system() {
            let text = if record.content.is_empty() {
                label
            } else {
                record.content.clone()
            };
            let _ = writeln!(&mut out, "--- {text} ---");
            continue;
        }
        let author = if record.author_id.is_empty() {
            "<unknown>"
        } else {
            record.author_id.as_str()
        };
        let _ = write!(&mut out, "[{label}] {author}: {}", record.content);
        if let Some(parent) = record.reply_to_id.as_deref() {
            let _ = write!(&mut out, " (reply to {parent})");
        }
        out.push('\n');
    }
    out
}

fn render_selection(selection: &Selection) -> String {
    format!(
        "space: {}\nzone:  {}\n",
        selection.selected_space_id.as_deref().unwrap_or("(none)"),
        selection.selected_zone_id.as_deref().unwrap_or("(none)"),
    )
}
