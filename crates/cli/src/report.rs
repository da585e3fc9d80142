//! `--report`: print duplicate groups without starting a session.

use std::io::Write;

use dedupe_finder::FinderOutput;

use crate::CliError;

/// One comma-separated id list per group on `out`, summary on `err`.
pub fn write_text<W: Write, E: Write>(found: &FinderOutput, out: &mut W, err: &mut E) -> Result<(), CliError> {
    for group in &found.groups {
        let ids: Vec<String> = group.members().iter().map(|id| id.to_string()).collect();
        writeln!(out, "{}", ids.join(",")).map_err(CliError::write)?;
    }

    let s = &found.summary;
    writeln!(
        err,
        "{} group(s), {} record(s) in groups; {} scanned, {} without address, {} PO box",
        s.groups, s.records_in_groups, s.records_scanned, s.excluded_no_address, s.excluded_pobox
    )
    .map_err(CliError::write)?;
    Ok(())
}

pub fn write_json<W: Write>(found: &FinderOutput, out: &mut W) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, found)
        .map_err(|e| CliError::io(format!("failed to write JSON: {}", e)))?;
    writeln!(out).map_err(CliError::write)?;
    Ok(())
}
