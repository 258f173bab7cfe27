use crate::task::Stage;

/// Dashboard blocks that have no data source yet.
pub const PLACEHOLDER_WIDGETS: [&str; 7] = [
    "Suggested contacts",
    "Pending tasks",
    "Business views",
    "Monthly report",
    "Today",
    "New products",
    "Growth",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSlice {
    pub stage: Stage,
    pub count: u64,
}

/// Task counts per stage, the data behind the dashboard chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub slices: Vec<StageSlice>,
}

impl StageSummary {
    /// One slice per stage, in board order. Stages missing from `counts` count as zero.
    pub fn from_counts(counts: impl IntoIterator<Item = (Stage, u64)>) -> Self {
        let mut slices: Vec<StageSlice> = Stage::ALL
            .iter()
            .map(|&stage| StageSlice { stage, count: 0 })
            .collect();
        for (stage, count) in counts {
            slices[stage.index()].count = count;
        }
        Self { slices }
    }

    pub fn total(&self) -> u64 {
        self.slices.iter().map(|s| s.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Share of `stage` in percent, 0 when there are no tasks.
    pub fn percent(&self, stage: Stage) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.slices[stage.index()].count as f64 * 100.0 / total as f64
    }
}

/// Reads a count endpoint body: a bare number, `{"count": n}`, or anything else as zero.
pub fn parse_count(value: &serde_json::Value) -> u64 {
    match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        serde_json::Value::Object(map) => map
            .get("count")
            .or_else(|| map.get("total"))
            .map_or(0, parse_count),
        _ => 0,
    }
}
