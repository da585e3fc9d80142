//! Line-oriented review for pipes and dumb terminals.

use std::io::{BufRead, Write};

use dedupe_session::{Command, EditSession, Outcome, HELP};

use crate::tui::data::GridData;
use crate::util;
use crate::CliError;

/// Read commands from `input` until the session ends or input runs out.
///
/// End of input leaves without saving, like `q`.
pub fn run<R: BufRead, W: Write>(session: &mut EditSession, input: R, out: &mut W) -> Result<(), CliError> {
    let mut lines = input.lines();
    let mut redraw = true;

    while !session.is_finished() {
        if redraw {
            if let Some(view) = session.view() {
                writeln!(out, "\nGroup {}", view.progress()).map_err(CliError::write)?;
                print_grid(out, &GridData::from_view(&view))?;
            }
        }

        let progress = session.progress().unwrap_or_default();
        write!(out, "{} > ", progress).map_err(CliError::write)?;
        out.flush().map_err(CliError::write)?;

        let Some(line) = lines.next() else {
            writeln!(out).map_err(CliError::write)?;
            log::info!("end of input; leaving without saving");
            break;
        };
        let line = line.map_err(|e| CliError::io(format!("failed to read command: {}", e)))?;

        redraw = false;
        let Some(cmd) = Command::parse(&line) else {
            writeln!(out, "unknown command {:?} (h for help)", line.trim()).map_err(CliError::write)?;
            continue;
        };

        match session.apply(cmd) {
            Ok(Outcome::ShowHelp) => {
                print_help(out)?;
                session.dismiss_help();
            }
            Ok(outcome) => {
                writeln!(out, "{}", outcome).map_err(CliError::write)?;
                redraw = !matches!(outcome, Outcome::Saved(_) | Outcome::Unchanged | Outcome::Finished);
            }
            Err(e) if e.is_fatal() => return Err(CliError::session(e)),
            Err(e) => {
                log::warn!("{e}");
                writeln!(out, "error: {}", e).map_err(CliError::write)?;
            }
        }
    }

    Ok(())
}

/// Print a group as a plain text table (no TUI, no raw mode).
///
/// The destination of the last field move is marked with `*`. Links that
/// don't fit their column are listed in full underneath.
pub fn print_grid<W: Write>(w: &mut W, grid: &GridData) -> Result<(), CliError> {
    let gutter = grid.label_width;

    // Header
    write!(w, "{} ", " ".repeat(gutter)).map_err(CliError::write)?;
    for (c, name) in grid.col_names.iter().enumerate() {
        write!(w, "{} ", util::pad_right(name, grid.col_widths[c])).map_err(CliError::write)?;
    }
    writeln!(w).map_err(CliError::write)?;

    // Separator
    write!(w, "{}-", "-".repeat(gutter)).map_err(CliError::write)?;
    for cw in &grid.col_widths {
        write!(w, "{}-", "-".repeat(*cw)).map_err(CliError::write)?;
    }
    writeln!(w).map_err(CliError::write)?;

    let mut marked = false;
    for (r, label) in grid.row_labels.iter().enumerate() {
        write!(w, "{} ", util::pad_right(label, gutter)).map_err(CliError::write)?;
        for (c, cell) in grid.rows[r].iter().enumerate() {
            let text = if cell.highlighted {
                marked = true;
                format!("*{}", cell.text)
            } else {
                cell.text.clone()
            };
            write!(w, "{} ", util::pad_right(&text, grid.col_widths[c])).map_err(CliError::write)?;
        }
        writeln!(w).map_err(CliError::write)?;
    }

    if grid.num_cols() == 0 {
        writeln!(w, "(every record in this group was deleted)").map_err(CliError::write)?;
    }
    if marked {
        writeln!(w, "* last change").map_err(CliError::write)?;
    }

    for (r, label) in grid.row_labels.iter().enumerate() {
        for (c, cell) in grid.rows[r].iter().enumerate() {
            let Some(url) = &cell.url else { continue };
            if util::display_width(&cell.text) + usize::from(cell.highlighted) > grid.col_widths[c] {
                writeln!(w, "{} {}: {}", grid.col_names[c], label.trim_start(), url).map_err(CliError::write)?;
            }
        }
    }
    Ok(())
}

fn print_help<W: Write>(w: &mut W) -> Result<(), CliError> {
    let key_width = HELP.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    writeln!(w, "Commands:").map_err(CliError::write)?;
    for (key, text) in HELP {
        writeln!(w, "  {:<kw$}  {}", key, text, kw = key_width).map_err(CliError::write)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dedupe_core::{DuplicateGroup, Field, Record, RecordId};
    use dedupe_io::DatasetStore;

    fn session() -> EditSession {
        let rec = |id: i64, notes: &str| {
            Record::new(id)
                .with(Field::NAME, "Archive")
                .with(Field::PRIMARY_ADDRESS, "1 Main St")
                .with(Field::CITY, "Boston")
                .with(Field::STATE, "MA")
                .with(Field::Notes, notes)
        };
        let store = DatasetStore::from_records(vec![rec(1, "alpha"), rec(2, "beta"), rec(3, ""), rec(4, "")]).unwrap();
        let groups = vec![
            DuplicateGroup::new(vec![RecordId(1), RecordId(2)]).unwrap(),
            DuplicateGroup::new(vec![RecordId(3), RecordId(4)]).unwrap(),
        ];
        EditSession::new(store, groups, "unused.csv")
    }

    fn drive(session: &mut EditSession, script: &str) -> String {
        let mut out = Vec::new();
        run(session, script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn walks_groups_and_marks_moves() {
        let mut s = session();
        let notes = Field::Notes.index() + 2;
        let out = drive(&mut s, &format!("m {notes} 1,2\nn\nn\n"));
        assert!(out.contains("Group [1/2]"));
        assert!(out.contains("*alpha"));
        assert!(out.contains("* last change"));
        assert!(out.contains("Group [2/2]"));
        assert!(out.contains("done"));
        assert!(s.is_finished());
        assert!(!s.store().get(RecordId(2)).unwrap().get(Field::UPDATED).is_empty());
    }

    #[test]
    fn reports_errors_and_keeps_going() {
        let mut s = session();
        let out = drive(&mut s, "d 7\nwhat\nh\nq\n");
        assert!(out.contains("error: no record number 7 (valid: 1-2)"));
        assert!(out.contains("unknown command \"what\""));
        assert!(out.contains("Commands:"));
        assert!(s.is_finished());
        assert_eq!(s.store().len(), 4);
    }

    #[test]
    fn long_links_listed_in_full() {
        let long = "https://www.example.org/collections/special/manuscripts/finding-aids/index.html";
        let rec = |id: i64, url: &str| {
            Record::new(id)
                .with(Field::NAME, "Archive")
                .with(Field::Url, url)
        };
        let store = DatasetStore::from_records(vec![rec(1, long), rec(2, "https://example.org")]).unwrap();
        let groups = vec![DuplicateGroup::new(vec![RecordId(1), RecordId(2)]).unwrap()];
        let mut s = EditSession::new(store, groups, "unused.csv");

        let out = drive(&mut s, "q\n");
        let url_label = format!("{} url", Field::Url.index() + 2);
        assert!(out.contains(&format!("#1 (1) {url_label}: {long}\n")), "{out}");
        assert!(!out.contains(&format!("#2 (2) {url_label}")), "{out}");
    }

    #[test]
    fn eof_leaves_session_open() {
        let mut s = session();
        let out = drive(&mut s, "d 2\n");
        assert!(out.contains("deleted record 2"));
        assert!(!s.is_finished());
        assert!(!s.store().contains(RecordId(2)));
    }
}
