use dedupe_session::GroupView;

use crate::util;

/// A group laid out for a terminal: one line per schema column, one
/// column per surviving member.
pub struct GridData {
    /// Member headers, e.g. `#2 (11)`
    pub col_names: Vec<String>,
    /// Field labels, e.g. ` 3 parent_org_unauthorized`
    pub row_labels: Vec<String>,
    /// `rows[field][member]`
    pub rows: Vec<Vec<GridCell>>,
    /// Pre-computed member column widths (display columns, clamped to [3, 40])
    pub col_widths: Vec<usize>,
    pub label_width: usize,
}

pub struct GridCell {
    pub text: String,
    pub highlighted: bool,
    /// Full target of a URL-like value, kept even when `text` is cut to fit
    pub url: Option<String>,
}

impl GridData {
    pub fn from_view(view: &GroupView) -> Self {
        let number_width = view.columns.len().to_string().len();
        let row_labels: Vec<String> = view
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:>w$} {}", i + 1, c.name(), w = number_width))
            .collect();

        let col_names: Vec<String> = view
            .rows
            .iter()
            .map(|r| format!("#{} ({})", r.position, r.id))
            .collect();

        let rows: Vec<Vec<GridCell>> = (0..view.columns.len())
            .map(|c| {
                view.rows
                    .iter()
                    .map(|member| {
                        let cell = &member.cells[c];
                        GridCell {
                            text: util::single_line(&cell.text),
                            highlighted: cell.highlighted,
                            url: cell.link.then(|| cell.text.trim().to_string()),
                        }
                    })
                    .collect()
            })
            .collect();

        let col_widths = Self::compute_widths(&col_names, &rows);
        let label_width = row_labels.iter().map(|s| util::display_width(s)).max().unwrap_or(0);

        Self { col_names, row_labels, rows, col_widths, label_width }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.col_names.len()
    }

    fn compute_widths(col_names: &[String], rows: &[Vec<GridCell>]) -> Vec<usize> {
        (0..col_names.len())
            .map(|c| {
                let header_w = util::display_width(&col_names[c]);
                let max_cell = rows
                    .iter()
                    .filter_map(|row| row.get(c))
                    // Room for the plain-mode `*` marker
                    .map(|cell| util::display_width(&cell.text) + usize::from(cell.highlighted))
                    .max()
                    .unwrap_or(0);
                header_w.max(max_cell).clamp(3, 40)
            })
            .collect()
    }
}
