//! Reconciles several table candidates into one grid.
//!
//! Detectors often split one visual table in two: a short header block and
//! the body below it. When the first candidate looks like such a header
//! (one or two rows), the body rows of every later candidate are appended
//! under it on the header's column count. Otherwise the candidate with the
//! most rows wins.

use tracing::debug;

use super::TableCandidate;

/// Outcome of candidate selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// The selected or merged grid.
    pub rows: Vec<Vec<String>>,
    /// Indices of the candidates that contributed rows.
    pub sources: Vec<usize>,
}

/// Selects or merges table candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableCandidateSelector;

impl TableCandidateSelector {
    pub fn new() -> Self {
        Self
    }

    /// Pick the table grid from `candidates`, `None` when there is nothing usable.
    pub fn select(&self, candidates: &[TableCandidate]) -> Option<Selection> {
        match candidates {
            [] => None,
            [only] => Some(Selection {
                rows: only.rows.clone(),
                sources: vec![0],
            }),
            [first, ..] if (1..=2).contains(&first.row_count()) => self
                .merge_under_header(candidates)
                .or_else(|| self.largest(candidates)),
            _ => self.largest(candidates),
        }
    }

    fn merge_under_header(&self, candidates: &[TableCandidate]) -> Option<Selection> {
        let first = &candidates[0];
        let header = first.rows.first().cloned().unwrap_or_default();
        let width = header.len();

        let mut body: Vec<Vec<String>> = Vec::new();
        let mut sources = vec![0];

        for row in first.rows.iter().skip(1) {
            body.push(fit_row(row, width));
        }

        for (index, candidate) in candidates.iter().enumerate().skip(1) {
            let before = body.len();
            for row in candidate.rows.iter().filter(|r| !r.is_empty()) {
                body.push(fit_row(row, width));
            }
            if body.len() > before {
                sources.push(index);
            }
        }

        if body.is_empty() {
            return None;
        }

        debug!(
            "Merged {} body rows under a {}-column header from {} candidates",
            body.len(),
            width,
            sources.len()
        );

        let rows = if header.is_empty() {
            body
        } else {
            std::iter::once(header).chain(body).collect()
        };
        Some(Selection { rows, sources })
    }

    fn largest(&self, candidates: &[TableCandidate]) -> Option<Selection> {
        let mut best: Option<(usize, &TableCandidate)> = None;
        for (index, candidate) in candidates.iter().enumerate() {
            // Strictly greater keeps the first candidate on ties.
            if best.is_none_or(|(_, b)| candidate.row_count() > b.row_count()) {
                best = Some((index, candidate));
            }
        }

        let (index, candidate) = best?;
        if candidate.rows.is_empty() {
            return None;
        }
        Some(Selection {
            rows: candidate.rows.clone(),
            sources: vec![index],
        })
    }
}

/// Pad with empty cells or truncate to `width`; width 0 keeps the row as is.
fn fit_row(row: &[String], width: usize) -> Vec<String> {
    if width == 0 {
        return row.to_vec();
    }
    let mut fitted: Vec<String> = row.iter().take(width).cloned().collect();
    fitted.resize(width, String::new());
    fitted
}
