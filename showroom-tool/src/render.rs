//! Console presentation of documents and artifacts.

use clap::ValueEnum;
use showroom_core::artifacts::{Artifact, ArtifactKind};
use showroom_core::model::Showroom;
use std::io::{self, Write};
use std::path::Path;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable details
    Verbose,
    /// JSON only, suitable for piping
    Json,
}

fn write_json<W: Write, T: serde::Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    writeln!(out, "{json}")
}

fn write_details<W: Write>(out: &mut W, showroom: &Showroom) -> io::Result<()> {
    writeln!(out, "Lab: {}", showroom.lab_name)?;
    writeln!(out, "Repository: {}", showroom.git_url)?;
    writeln!(out, "Ref: {}", showroom.git_ref)?;
    writeln!(out, "Modules: {}", showroom.modules().len())?;
    for (i, module) in showroom.modules().iter().enumerate() {
        let name = if module.module_name.is_empty() {
            "(untitled)"
        } else {
            module.module_name.as_str()
        };
        writeln!(
            out,
            "  {:>2}. {} ({}): {} words, {} lines",
            i + 1,
            name,
            module.filename,
            module.word_count(),
            module.line_count()
        )?;
    }
    writeln!(
        out,
        "Total: {} words, {} lines",
        showroom.total_words(),
        showroom.total_lines()
    )
}

pub fn print_showroom<W: Write>(out: &mut W, showroom: &Showroom, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Verbose => write_details(out, showroom),
        OutputFormat::Json => write_json(out, showroom),
    }
}

pub fn print_artifact<W: Write>(
    out: &mut W,
    showroom: &Showroom,
    artifact: &Artifact,
    saved: &Path,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => write_json(out, artifact),
        OutputFormat::Verbose => {
            write_details(out, showroom)?;
            writeln!(out)?;
            writeln!(out, "{}:", artifact.kind().tag())?;
            write_json(out, artifact)?;
            if let Artifact::Review(review) = artifact {
                writeln!(out, "Average score: {:.1}/10", review.average_score())?;
            }
            writeln!(out, "Saved to {}", saved.display())
        }
    }
}

pub fn print_prompt<W: Write>(out: &mut W, kind: ArtifactKind, system_prompt: &str) -> io::Result<()> {
    writeln!(out, "System prompt for {kind}:")?;
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "{system_prompt}")?;
    writeln!(out, "{}", "=".repeat(60))
}
