//! Fingerprint table shape and CSV parsing
//!
//! A table is keyed by rows labelled `"<N>m TTC"` and columns labelled
//! `">= +X.XX%"` (upward moves) or `"<= -X.XX%"` (downward moves). Cells are
//! the historical percentage of cases where price moved at least that far
//! within that many minutes. Blank cells are missing samples.

use super::types::{FingerprintError, MomentumBucket, MoveDirection};

/// Hit-rate samples for one move direction
#[derive(Debug, Clone)]
pub struct DirectionGrid {
    /// Absolute move thresholds in percent, strictly increasing
    thresholds: Vec<f64>,
    /// `values[ttc_idx][threshold_idx]`, NaN where no sample exists
    values: Vec<Vec<f64>>,
}

impl DirectionGrid {
    /// Build a grid, validating its shape against the number of TTC rows
    pub fn new(
        id: &str,
        thresholds: Vec<f64>,
        values: Vec<Vec<f64>>,
        ttc_rows: usize,
    ) -> Result<Self, FingerprintError> {
        let invalid = |reason: String| FingerprintError::InvalidTable {
            id: id.to_string(),
            reason,
        };

        if thresholds.is_empty() {
            return Err(invalid("no threshold columns".to_string()));
        }
        if thresholds.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(invalid("thresholds must be finite and non-negative".to_string()));
        }
        if thresholds.windows(2).any(|w| w[1] <= w[0]) {
            return Err(invalid("thresholds must be strictly increasing".to_string()));
        }
        if values.len() != ttc_rows {
            return Err(invalid(format!(
                "expected {} rows, found {}",
                ttc_rows,
                values.len()
            )));
        }

        let mut any_sample = false;
        for row in &values {
            if row.len() != thresholds.len() {
                return Err(invalid(format!(
                    "expected {} columns, found {}",
                    thresholds.len(),
                    row.len()
                )));
            }
            for v in row {
                if v.is_nan() {
                    continue;
                }
                if !(0.0..=100.0).contains(v) {
                    return Err(invalid(format!("value {} outside [0, 100]", v)));
                }
                any_sample = true;
            }
        }
        if !any_sample {
            return Err(invalid("direction has no samples".to_string()));
        }

        Ok(Self { thresholds, values })
    }

    /// Move thresholds in percent
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Largest threshold in the grid
    pub fn max_threshold(&self) -> f64 {
        self.thresholds.last().copied().unwrap_or(0.0)
    }

    /// Sample at `(ttc_idx, threshold_idx)`, `None` if missing
    pub fn value(&self, ttc_idx: usize, threshold_idx: usize) -> Option<f64> {
        self.values
            .get(ttc_idx)
            .and_then(|row| row.get(threshold_idx))
            .copied()
            .filter(|v| !v.is_nan())
    }
}

/// Historical hit-rate table for one symbol and momentum bucket
#[derive(Debug, Clone)]
pub struct FingerprintTable {
    id: String,
    symbol: String,
    bucket: MomentumBucket,
    ttc_seconds: Vec<f64>,
    positive: DirectionGrid,
    negative: DirectionGrid,
}

impl FingerprintTable {
    /// Assemble a table from validated parts
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        bucket: MomentumBucket,
        ttc_seconds: Vec<f64>,
        positive: DirectionGrid,
        negative: DirectionGrid,
    ) -> Result<Self, FingerprintError> {
        let id = id.into();
        if ttc_seconds.is_empty() {
            return Err(FingerprintError::InvalidTable {
                id,
                reason: "no TTC rows".to_string(),
            });
        }
        if ttc_seconds.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FingerprintError::InvalidTable {
                id,
                reason: "TTC rows must be strictly increasing".to_string(),
            });
        }

        Ok(Self {
            id,
            symbol: symbol.into(),
            bucket,
            ttc_seconds,
            positive,
            negative,
        })
    }

    /// Parse a table from CSV text
    pub fn from_csv_str(
        id: &str,
        symbol: &str,
        bucket: MomentumBucket,
        content: &str,
    ) -> Result<Self, FingerprintError> {
        let parse_err = |line: usize, reason: String| FingerprintError::Parse {
            id: id.to_string(),
            line,
            reason,
        };

        let mut lines = content
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (header_line, header) = lines
            .next()
            .ok_or_else(|| parse_err(1, "empty file".to_string()))?;

        // Column index -> (direction, threshold); first header cell labels rows
        let mut columns: Vec<(MoveDirection, f64)> = Vec::new();
        for label in header.split(',').skip(1) {
            let parsed = parse_threshold_label(label).ok_or_else(|| {
                parse_err(header_line, format!("invalid threshold label {:?}", label))
            })?;
            columns.push(parsed);
        }

        let mut rows: Vec<(f64, Vec<f64>)> = Vec::new();
        for (line_no, line) in lines {
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() != columns.len() + 1 {
                return Err(parse_err(
                    line_no,
                    format!(
                        "expected {} cells, found {}",
                        columns.len() + 1,
                        parts.len()
                    ),
                ));
            }

            let ttc = parse_ttc_label(parts[0])
                .ok_or_else(|| parse_err(line_no, format!("invalid TTC label {:?}", parts[0])))?;

            let mut cells = Vec::with_capacity(columns.len());
            for cell in &parts[1..] {
                let cell = cell.trim();
                if cell.is_empty() {
                    cells.push(f64::NAN);
                    continue;
                }
                let v: f64 = cell
                    .parse()
                    .map_err(|_| parse_err(line_no, format!("invalid value {:?}", cell)))?;
                cells.push(v);
            }
            rows.push((ttc as f64, cells));
        }

        rows.sort_by(|a, b| a.0.total_cmp(&b.0));
        let ttc_seconds: Vec<f64> = rows.iter().map(|(t, _)| *t).collect();

        let positive = split_direction(id, &columns, &rows, MoveDirection::Up)?;
        let negative = split_direction(id, &columns, &rows, MoveDirection::Down)?;

        Self::new(id, symbol, bucket, ttc_seconds, positive, negative)
    }

    /// Identifier published alongside results (file stem for CSV tables)
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bucket(&self) -> MomentumBucket {
        self.bucket
    }

    /// TTC sample points in seconds
    pub fn ttc_seconds(&self) -> &[f64] {
        &self.ttc_seconds
    }

    /// Smallest and largest TTC sample
    pub fn ttc_range(&self) -> (f64, f64) {
        let first = self.ttc_seconds.first().copied().unwrap_or(0.0);
        let last = self.ttc_seconds.last().copied().unwrap_or(first);
        (first, last)
    }

    /// Grid for the given move direction
    pub fn grid(&self, direction: MoveDirection) -> &DirectionGrid {
        match direction {
            MoveDirection::Up => &self.positive,
            MoveDirection::Down => &self.negative,
        }
    }
}

/// Extract one direction's columns (sorted by threshold) from parsed rows
fn split_direction(
    id: &str,
    columns: &[(MoveDirection, f64)],
    rows: &[(f64, Vec<f64>)],
    direction: MoveDirection,
) -> Result<DirectionGrid, FingerprintError> {
    let mut picked: Vec<(usize, f64)> = columns
        .iter()
        .enumerate()
        .filter(|(_, (d, _))| *d == direction)
        .map(|(i, (_, t))| (i, *t))
        .collect();
    picked.sort_by(|a, b| a.1.total_cmp(&b.1));

    let thresholds = picked.iter().map(|(_, t)| *t).collect();
    let values = rows
        .iter()
        .map(|(_, cells)| picked.iter().map(|(i, _)| cells[*i]).collect())
        .collect();

    DirectionGrid::new(id, thresholds, values, rows.len())
}

/// Parse a row label such as `"5m TTC"` into seconds
pub fn parse_ttc_label(label: &str) -> Option<u32> {
    let minutes = label
        .trim()
        .strip_suffix("TTC")?
        .trim()
        .strip_suffix('m')?
        .trim()
        .parse::<u32>()
        .ok()?;
    (minutes > 0).then(|| minutes * 60)
}

/// Parse a column label such as `">= +0.25%"` or `"<= -0.25%"`
pub fn parse_threshold_label(label: &str) -> Option<(MoveDirection, f64)> {
    let label = label.trim();
    let (direction, rest) = if let Some(rest) = label.strip_prefix(">=") {
        (MoveDirection::Up, rest.trim().trim_start_matches('+'))
    } else if let Some(rest) = label.strip_prefix("<=") {
        (MoveDirection::Down, rest.trim().trim_start_matches('-'))
    } else {
        return None;
    };

    let value: f64 = rest.strip_suffix('%')?.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some((direction, value))
}
