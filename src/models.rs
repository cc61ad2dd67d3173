use chrono::NaiveDate;

// Timestamps stay in the framework's text format; parsing happens in the
// engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub test_name: String,
    pub sw_version: String,
    pub started_at: String,
    pub ended_at: String,
    pub runtime: String,
    pub try_count: i32,
    pub result_tag: String,
    pub detail: String,
}

impl ResultRecord {
    pub fn kind(&self) -> ResultKind {
        ResultKind::classify(&self.result_tag)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultGroup {
    pub ran_at: String,
    pub records: Vec<ResultRecord>,
}

/// Unrecognized tags fall into `Error`, never a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Pass,
    Fail,
    Error,
    TcError,
    AppError,
    SopError,
}

impl ResultKind {
    pub const ALL: [ResultKind; 6] = [
        ResultKind::Pass,
        ResultKind::Fail,
        ResultKind::Error,
        ResultKind::TcError,
        ResultKind::AppError,
        ResultKind::SopError,
    ];

    pub fn classify(tag: &str) -> Self {
        match tag {
            "PASS" => ResultKind::Pass,
            "FAIL" => ResultKind::Fail,
            "TC_FAIL" => ResultKind::TcError,
            "APP_ERROR" => ResultKind::AppError,
            "SPORADIC_BEHAVIOR" => ResultKind::SopError,
            _ => ResultKind::Error,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResultKind::Pass => "PASS",
            ResultKind::Fail => "FAIL",
            ResultKind::Error => "ERROR",
            ResultKind::TcError => "TC-Error",
            ResultKind::AppError => "App-Error",
            ResultKind::SopError => "Sop-Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultFilter {
    All,
    Tag(String),
}

impl ResultFilter {
    pub fn matches(&self, tag: &str) -> bool {
        match self {
            ResultFilter::All => true,
            ResultFilter::Tag(wanted) => wanted.eq_ignore_ascii_case(tag),
        }
    }
}

impl std::str::FromStr for ResultFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ALL") {
            Ok(ResultFilter::All)
        } else {
            Ok(ResultFilter::Tag(s.to_string()))
        }
    }
}

impl Default for ResultFilter {
    fn default() -> Self {
        ResultFilter::All
    }
}

// Unset bounds are unbounded; both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterSpec {
    pub result: ResultFilter,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Stable row identifier for drill-down, immune to re-filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKey {
    pub ran_at: String,
    pub test_name: String,
    pub try_count: i32,
}

impl RowKey {
    pub fn of(group: &ResultGroup, record: &ResultRecord) -> Self {
        RowKey {
            ran_at: group.ran_at.clone(),
            test_name: record.test_name.clone(),
            try_count: record.try_count,
        }
    }
}

// The six counts always sum to the number of rows fed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateCounts {
    pub pass: u64,
    pub fail: u64,
    pub error: u64,
    pub tc_error: u64,
    pub app_error: u64,
    pub sop_error: u64,
}

impl AggregateCounts {
    pub fn bump(&mut self, kind: ResultKind) {
        self.add(kind, 1);
    }

    pub fn add(&mut self, kind: ResultKind, n: u64) {
        match kind {
            ResultKind::Pass => self.pass += n,
            ResultKind::Fail => self.fail += n,
            ResultKind::Error => self.error += n,
            ResultKind::TcError => self.tc_error += n,
            ResultKind::AppError => self.app_error += n,
            ResultKind::SopError => self.sop_error += n,
        }
    }

    pub fn count(&self, kind: ResultKind) -> u64 {
        match kind {
            ResultKind::Pass => self.pass,
            ResultKind::Fail => self.fail,
            ResultKind::Error => self.error,
            ResultKind::TcError => self.tc_error,
            ResultKind::AppError => self.app_error,
            ResultKind::SopError => self.sop_error,
        }
    }

    pub fn total(&self) -> u64 {
        ResultKind::ALL.iter().map(|kind| self.count(*kind)).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarRow {
    pub date: NaiveDate,
    pub category: ResultKind,
    pub count: u64,
    pub testplace: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub category: ResultKind,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub testplace: String,
    pub count: u64,
}

// Sentinel states carry their message in `title` with empty tables and
// zeroed cards.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartBundle {
    pub title: String,
    pub bars: Vec<BarRow>,
    pub pie: Vec<PieSlice>,
    pub trend: Vec<TrendPoint>,
    pub cards: AggregateCounts,
}

impl ChartBundle {
    pub fn no_data() -> Self {
        ChartBundle::sentinel("No Testplaces Selected")
    }

    pub fn error() -> Self {
        ChartBundle::sentinel("Error")
    }

    fn sentinel(title: &str) -> Self {
        ChartBundle {
            title: title.to_string(),
            bars: Vec::new(),
            pie: Vec::new(),
            trend: Vec::new(),
            cards: AggregateCounts::default(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.bars.is_empty() && self.pie.is_empty()
    }
}
