//! macalog CLI - look up treatments for macadamia symptoms
//!
//! ```text
//! macalog [--config FILE] [--source FILE] [--export FILE] <command>
//!
//! commands:
//!   symptoms            list every known symptom
//!   treat <symptom...>  list treatments for a symptom
//!   export <FILE>       write a fact dump
//!   report              print load counts as JSON
//! ```

use anyhow::{bail, Context};
use log::info;
use macalog::{export, Config, KnowledgeBase};
use std::fs::File;
use std::io::{self, stdout, BufWriter, Write};
use std::path::{Path, PathBuf};

const USAGE: &str =
    "usage: macalog [--config FILE] [--source FILE] [--export FILE] (symptoms | treat <symptom...> | export <FILE> | report)";

#[derive(Debug)]
enum Command {
    Symptoms,
    Treat(String),
    Export(PathBuf),
    Report,
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    source: Option<PathBuf>,
    export: Option<PathBuf>,
    command: Option<Command>,
}

fn value_of(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next().with_context(|| format!("{flag} needs a value"))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(value_of(&mut args, "--config")?.into()),
            "--source" => parsed.source = Some(value_of(&mut args, "--source")?.into()),
            "--export" => parsed.export = Some(value_of(&mut args, "--export")?.into()),
            "symptoms" => parsed.command = Some(Command::Symptoms),
            "treat" => {
                let symptom = args.by_ref().collect::<Vec<_>>().join(" ");
                if symptom.trim().is_empty() {
                    bail!("treat needs a symptom\n{USAGE}");
                }
                parsed.command = Some(Command::Treat(symptom));
                break;
            }
            "export" => parsed.command = Some(Command::Export(value_of(&mut args, "export")?.into())),
            "report" => parsed.command = Some(Command::Report),
            "-h" | "--help" => bail!("{USAGE}"),
            other => bail!("unexpected argument `{other}`\n{USAGE}"),
        }
    }
    Ok(parsed)
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let base = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    let mut config = base.with_env();
    if let Some(source) = &args.source {
        config.source.clone_from(source);
    }
    if args.export.is_some() {
        config.export.clone_from(&args.export);
    }
    Ok(config)
}

fn write_dump(kb: &KnowledgeBase, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    export::write_facts(kb, BufWriter::new(file))
        .with_context(|| format!("writing {}", path.display()))?;
    info!("fact dump written to {}", path.display());
    Ok(())
}

fn write_treatments(kb: &KnowledgeBase, symptom: &str, mut out: impl Write) -> io::Result<()> {
    let mut treatments = kb.treatments_for(symptom);
    if treatments.is_empty() {
        return writeln!(out, "No specific treatment found in the knowledge base.");
    }
    treatments.sort_unstable();
    writeln!(out, "Treatments found for: {symptom}")?;
    for treatment in treatments {
        writeln!(out, "  -> {treatment}")?;
    }
    Ok(())
}

fn write_report(kb: &KnowledgeBase, mut out: impl Write) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut out, &kb.report())?;
    writeln!(out)?;
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = load_config(&args)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let kb = KnowledgeBase::load(&config.source).context("knowledge base unavailable")?;
    if let Some(path) = &config.export {
        write_dump(&kb, path)?;
    }

    let mut out = stdout().lock();
    match args.command {
        None => {}
        Some(Command::Symptoms) => {
            for symptom in kb.symptoms() {
                writeln!(out, "{symptom}")?;
            }
        }
        Some(Command::Treat(symptom)) => write_treatments(&kb, &symptom, &mut out)?,
        Some(Command::Export(path)) => write_dump(&kb, &path)?,
        Some(Command::Report) => write_report(&kb, &mut out)?,
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
