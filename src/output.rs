use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::convert::{ProgressEvent, ProgressSink};
use crate::report::ConversionReport;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(result: &ConversionReport) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct HumanOutput;

impl HumanOutput {
    pub fn print_report(report: &ConversionReport) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        Self::write_report(&mut stdout, report)
    }

    pub fn write_report(out: &mut impl Write, report: &ConversionReport) -> io::Result<()> {
        let action = if report.written { "wrote" } else { "would write" };
        writeln!(out, "{} -> SAINT files", report.input)?;
        writeln!(out, "  {action} {} ({} baits)", report.outputs.bait, report.baits)?;
        writeln!(out, "  {action} {} ({} preys)", report.outputs.prey, report.preys)?;
        writeln!(
            out,
            "  {action} {} ({} interactions)",
            report.outputs.interactions, report.interactions
        )?;
        let fallbacks = report.diagnostics.fallback_lengths.len();
        if fallbacks > 0 {
            writeln!(
                out,
                "  {fallbacks} preys use the average length {}",
                report.average_length
            )?;
        }
        for warning in &report.diagnostics.warnings {
            writeln!(out, "  warning: {warning}")?;
        }
        Ok(())
    }
}

impl ProgressSink for HumanOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!("{} ({:.2?})", event.message, elapsed),
            None => info!("{}", event.message),
        }
    }
}
