use super::domain::{GenderBalanceRow, SubmissionId};
use serde::Serialize;
use std::collections::HashMap;

/// Lower bound of the aligned band, in percent of the denominator.
pub const ALIGNED_MIN_PERCENT: u64 = 33;
/// Upper bound of the aligned band, in percent of the denominator.
pub const ALIGNED_MAX_PERCENT: u64 = 67;

/// Women/men/total head counts summed over a submission's gender balance rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderTotals {
    pub women: u64,
    pub men: u64,
    pub total: u64,
}

/// Per-submission totals. Submissions without rows are absent; use [`totals_for`].
pub type AggregateMap = HashMap<SubmissionId, GenderTotals>;

impl GenderTotals {
    pub fn add_row(&mut self, row: &GenderBalanceRow) {
        self.women += u64::from(row.women);
        self.men += u64::from(row.men);
        self.total += u64::from(row.total);
    }

    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a GenderBalanceRow>,
    {
        let mut totals = Self::default();
        for row in rows {
            totals.add_row(row);
        }
        totals
    }

    /// Stored total when positive, otherwise `women + men`.
    pub fn denominator(&self) -> u64 {
        if self.total > 0 {
            self.total
        } else {
            self.women + self.men
        }
    }

    /// Percentages are rounded half-up independently, so they may not sum to 100.
    pub fn percentages(&self) -> GenderPercentages {
        let denom = self.denominator();
        GenderPercentages {
            women_percent: rounded_percent(self.women, denom),
            men_percent: rounded_percent(self.men, denom),
        }
    }

    /// Women share within the inclusive 33-67% band. Submissions without
    /// head counts have a share of zero and are never aligned.
    pub fn meets_alignment(&self) -> bool {
        let denom = self.denominator();
        if denom == 0 {
            return false;
        }
        let scaled = self.women * 100;
        scaled >= ALIGNED_MIN_PERCENT * denom && scaled <= ALIGNED_MAX_PERCENT * denom
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderPercentages {
    pub women_percent: u8,
    pub men_percent: u8,
}

fn rounded_percent(part: u64, denom: u64) -> u8 {
    if denom == 0 {
        return 0;
    }
    let rounded = (part * 200 + denom) / (denom * 2);
    rounded.min(100) as u8
}

pub fn totals_for(map: &AggregateMap, id: &SubmissionId) -> GenderTotals {
    map.get(id).copied().unwrap_or_default()
}

/// Sums rows grouped by owning submission, restricted to `ids`.
pub fn aggregate_rows<'a, I>(rows: I, ids: &[SubmissionId]) -> AggregateMap
where
    I: IntoIterator<Item = (&'a SubmissionId, &'a GenderBalanceRow)>,
{
    let wanted: std::collections::HashSet<&SubmissionId> = ids.iter().collect();
    let mut map = AggregateMap::new();
    for (id, row) in rows {
        if wanted.contains(id) {
            map.entry(id.clone()).or_default().add_row(row);
        }
    }
    map
}
