//! Writing fit summaries as TSV or JSON

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::lm::FitSummary;

/// Output format for fit summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SummaryFormat {
    #[default]
    Tsv,
    Json,
}

/// Term names across all summaries, in first-seen order
fn term_names(summaries: &[FitSummary]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for t in summaries.iter().flat_map(|s| &s.terms) {
        if !names.contains(&t.term) {
            names.push(t.term.clone());
        }
    }
    names
}

/// One row per summary: estimates and p-values per coefficient, the
/// overall test, then F and p per ANOVA term
pub fn write_summaries_tsv<W: Write>(mut writer: W, summaries: &[FitSummary]) -> Result<()> {
    let coefficients: Vec<&str> = summaries
        .first()
        .map(|s| s.coefficients.iter().map(|c| c.name.as_str()).collect())
        .unwrap_or_default();
    let terms = term_names(summaries);

    let mut header = vec!["row".to_string()];
    for c in &coefficients {
        header.push(format!("{}_estimate", c));
        header.push(format!("{}_pvalue", c));
    }
    header.extend(
        ["residual_df", "sigma", "F", "pvalue", "padj"]
            .iter()
            .map(|s| s.to_string()),
    );
    for t in &terms {
        header.push(format!("{}_term_F", t));
        header.push(format!("{}_term_pvalue", t));
    }
    writeln!(writer, "{}", header.join("\t"))?;

    for s in summaries {
        let mut fields = vec![s.row.clone()];
        for c in &s.coefficients {
            fields.push(format!("{:.6}", c.estimate));
            fields.push(format!("{:.6e}", c.p_value));
        }
        fields.push(s.residual_df.to_string());
        fields.push(format!("{:.6}", s.sigma));
        fields.push(format!("{:.6}", s.f_statistic));
        fields.push(format!("{:.6e}", s.p_value));
        fields.push(format!("{:.6e}", s.adjusted_p_value));
        for t in &terms {
            match s.terms.iter().find(|a| &a.term == t) {
                Some(a) => {
                    fields.push(format!("{:.6}", a.f_statistic));
                    fields.push(format!("{:.6e}", a.p_value));
                }
                None => {
                    fields.push("NaN".to_string());
                    fields.push("NaN".to_string());
                }
            }
        }
        writeln!(writer, "{}", fields.join("\t"))?;
    }
    Ok(())
}

/// Pretty-printed JSON array; non-finite statistics are written as `null`
pub fn write_summaries_json<W: Write>(writer: W, summaries: &[FitSummary]) -> Result<()> {
    serde_json::to_writer_pretty(writer, summaries)?;
    Ok(())
}

pub fn write_summaries<P: AsRef<Path>>(path: P, summaries: &[FitSummary], format: SummaryFormat) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    match format {
        SummaryFormat::Tsv => write_summaries_tsv(&mut writer, summaries)?,
        SummaryFormat::Json => write_summaries_json(&mut writer, summaries)?,
    }
    writer.flush()?;
    log::info!("Wrote {} fit summaries to {}", summaries.len(), path.as_ref().display());
    Ok(())
}
