use std::io::{IsTerminal, Write};

use blazewire_client::{PatternEntry, PlaylistUpdate, SequencerState, Settings, Stats};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn print_patterns(patterns: &[PatternEntry], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(patterns),
        OutputFormat::Table => {
            let mut table = table(vec!["ID", "NAME"]);
            for pattern in patterns {
                table.add_row(vec![pattern.id.clone(), pattern.name.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for pattern in patterns {
                println!("{:<24} {}", pattern.id, pattern.name);
            }
        }
        OutputFormat::Raw => {
            for pattern in patterns {
                println!("{}", pattern.id);
            }
        }
    }
}

#[derive(Serialize)]
struct SystemStateOutput<'a> {
    settings: &'a Settings,
    sequencer: Option<&'a SequencerState>,
}

pub fn print_system_state(
    settings: &Settings,
    sequencer: Option<&SequencerState>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&SystemStateOutput {
            settings,
            sequencer,
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut rows = vec![
                ("Name", settings.name.clone()),
                ("Pixels", settings.pixel_count.to_string()),
                ("Brightness", format!("{:.2}", settings.brightness)),
                ("Color order", settings.color_order.clone()),
                ("Sequencer", settings.run_sequencer.to_string()),
            ];
            if let Some(state) = sequencer {
                rows.push(("Active pattern", state.name.clone()));
                rows.push(("Pattern id", state.active_program_id.clone()));
                rows.push(("Controls", state.controls.len().to_string()));
            }

            if format == OutputFormat::Table {
                let mut table = table(vec!["SETTING", "VALUE"]);
                for (key, value) in rows {
                    table.add_row(vec![key.to_string(), value]);
                }
                println!("{table}");
            } else {
                for (key, value) in rows {
                    println!("  {:<16}{}", format!("{key}:"), value);
                }
            }
        }
        OutputFormat::Raw => println!("{}", settings.name),
    }
}

/// Something the controller pushed while being watched.
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event<'a> {
    Stats(&'a Stats),
    PatternChange(&'a SequencerState),
    PlaylistChange(&'a PlaylistUpdate),
}

pub fn print_event(event: &Event<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(event),
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => match event {
            Event::Stats(stats) => println!(
                "stats fps={:.1} mem={} uptime={}s",
                stats.fps,
                stats.mem_bytes,
                stats.uptime_ms / 1000
            ),
            Event::PatternChange(state) => println!(
                "pattern {} ({}) controls={}",
                state.name,
                state.active_program_id,
                state.controls.len()
            ),
            Event::PlaylistChange(update) => {
                println!("playlist {} items={}", update.id, update.items.len())
            }
        },
    }
}
