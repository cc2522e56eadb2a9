//! Row sampling for dry runs.

use clap::ValueEnum;
use rand::seq::index;

/// Rows kept by a dry run
pub const DRY_RUN_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SamplingMode {
    #[default]
    Top,
    Bottom,
    Random,
}

/// Keep `n` rows. Random samples keep the input order.
pub fn sample_rows<T>(rows: Vec<T>, mode: SamplingMode, n: usize) -> Vec<T> {
    if rows.len() <= n {
        return rows;
    }
    match mode {
        SamplingMode::Top => rows.into_iter().take(n).collect(),
        SamplingMode::Bottom => {
            let skip = rows.len() - n;
            rows.into_iter().skip(skip).collect()
        }
        SamplingMode::Random => {
            let mut picked = index::sample(&mut rand::thread_rng(), rows.len(), n).into_vec();
            picked.sort_unstable();
            let mut picked = picked.into_iter().peekable();
            rows.into_iter()
                .enumerate()
                .filter_map(|(idx, row)| {
                    if picked.peek() == Some(&idx) {
                        picked.next();
                        Some(row)
                    } else {
                        None
                    }
                })
                .collect()
        }
    }
}
