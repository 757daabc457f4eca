//! Chart model: charts, series, samples and the per-chart color pool

use crate::domain::types::NodeType;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// The fixed palette series colors are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorName {
    Blue,
    Green,
    Red,
    Orange,
    Purple,
    Teal,
    Pink,
    Brown,
    Olive,
    Navy,
    Gold,
    Gray,
    Cyan,
    Magenta,
}

impl ColorName {
    pub const ALL: [ColorName; 14] = [
        ColorName::Blue,
        ColorName::Green,
        ColorName::Red,
        ColorName::Orange,
        ColorName::Purple,
        ColorName::Teal,
        ColorName::Pink,
        ColorName::Brown,
        ColorName::Olive,
        ColorName::Navy,
        ColorName::Gold,
        ColorName::Gray,
        ColorName::Cyan,
        ColorName::Magenta,
    ];

    fn rgb(&self) -> (u8, u8, u8) {
        match self {
            ColorName::Blue => (31, 119, 180),
            ColorName::Green => (44, 160, 44),
            ColorName::Red => (214, 39, 40),
            ColorName::Orange => (255, 127, 14),
            ColorName::Purple => (148, 103, 189),
            ColorName::Teal => (23, 190, 207),
            ColorName::Pink => (227, 119, 194),
            ColorName::Brown => (140, 86, 75),
            ColorName::Olive => (188, 189, 34),
            ColorName::Navy => (0, 31, 91),
            ColorName::Gold => (212, 175, 55),
            ColorName::Gray => (127, 127, 127),
            ColorName::Cyan => (0, 172, 193),
            ColorName::Magenta => (194, 24, 91),
        }
    }
}

/// A named color with its three display shades
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorAssignment {
    pub name: ColorName,
    pub color: String,
    pub lighter: String,
    pub lightest: String,
}

impl ColorAssignment {
    pub fn of(name: ColorName) -> Self {
        let (r, g, b) = name.rgb();
        Self {
            name,
            color: format!("rgba({r}, {g}, {b}, 1)"),
            lighter: format!("rgba({r}, {g}, {b}, 0.6)"),
            lightest: format!("rgba({r}, {g}, {b}, 0.3)"),
        }
    }
}

/// Order-preserving set of colors not yet handed to a series
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorPool(VecDeque<ColorAssignment>);

impl ColorPool {
    /// All 14 palette colors in palette order
    pub fn full() -> Self {
        Self(ColorName::ALL.iter().copied().map(ColorAssignment::of).collect())
    }

    /// The palette minus the colors already held elsewhere
    pub fn full_except(held: impl IntoIterator<Item = ColorName>) -> Self {
        let held: Vec<ColorName> = held.into_iter().collect();
        Self(
            ColorName::ALL
                .iter()
                .copied()
                .filter(|name| !held.contains(name))
                .map(ColorAssignment::of)
                .collect(),
        )
    }

    #[inline]
    pub fn acquire(&mut self) -> Option<ColorAssignment> {
        self.0.pop_front()
    }

    /// Return a color to the back of the pool unless it is already there
    pub fn release(&mut self, color: ColorAssignment) {
        if !self.contains(color.name) {
            self.0.push_back(color);
        }
    }

    #[inline]
    pub fn contains(&self, name: ColorName) -> bool {
        self.0.iter().any(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = ColorName> + '_ {
        self.0.iter().map(|c| c.name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartType {
    #[default]
    #[serde(rename = "line", alias = "lineChart")]
    Line,
    #[serde(rename = "lineWithFocus")]
    LineWithFocus,
    #[serde(rename = "stackedArea")]
    StackedArea,
    #[serde(rename = "cumulativeLine")]
    CumulativeLine,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::LineWithFocus => "lineWithFocus",
            ChartType::StackedArea => "stackedArea",
            ChartType::CumulativeLine => "cumulativeLine",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" | "lineChart" => Ok(ChartType::Line),
            "lineWithFocus" => Ok(ChartType::LineWithFocus),
            "stackedArea" => Ok(ChartType::StackedArea),
            "cumulativeLine" => Ok(ChartType::CumulativeLine),
            other => Err(format!("unknown chart type: {other}")),
        }
    }
}

/// Sample timestamp as delivered by the historian or after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleTime {
    Millis(i64),
    Text(String),
}

impl SampleTime {
    /// Convert an ISO string to epoch millis (UTC); millis pass through.
    ///
    /// The first `+00:00` offset is dropped before parsing. Strings that still
    /// fail to parse are kept as text.
    pub fn normalized(self) -> SampleTime {
        match self {
            SampleTime::Millis(ms) => SampleTime::Millis(ms),
            SampleTime::Text(text) => {
                let stripped = text.replacen("+00:00", "", 1);
                match parse_utc_millis(&stripped) {
                    Some(ms) => SampleTime::Millis(ms),
                    None => SampleTime::Text(stripped),
                }
            }
        }
    }

    pub fn as_millis(&self) -> Option<i64> {
        match self {
            SampleTime::Millis(ms) => Some(*ms),
            SampleTime::Text(_) => None,
        }
    }
}

fn parse_utc_millis(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{text}Z")) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// One `[time, value]` point with its denormalized series identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSample")]
pub struct TimedSample {
    #[serde(rename = "0")]
    pub time: SampleTime,
    #[serde(rename = "1")]
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// Historian rows arrive as `[t, v]`; persisted charts carry keyed objects
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSample {
    Pair(SampleTime, f64),
    Keyed {
        #[serde(rename = "0")]
        time: SampleTime,
        #[serde(rename = "1")]
        value: f64,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        uuid: Option<String>,
    },
}

impl From<RawSample> for TimedSample {
    fn from(raw: RawSample) -> Self {
        match raw {
            RawSample::Pair(time, value) => TimedSample::new(time, value),
            RawSample::Keyed { time, value, name, parent, uuid } => {
                TimedSample { time, value, name, parent, uuid }
            }
        }
    }
}

impl TimedSample {
    pub fn new(time: SampleTime, value: f64) -> Self {
        Self { time, value, name: None, parent: None, uuid: None }
    }

    pub fn at(millis: i64, value: f64) -> Self {
        Self::new(SampleTime::Millis(millis), value)
    }

    pub fn normalized(mut self) -> Self {
        self.time = self.time.normalized();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub parent_uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<NodeType>,
    #[serde(default)]
    pub parent_path: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<ColorAssignment>,
    #[serde(default)]
    pub data: Vec<TimedSample>,
}

pub fn default_data_length() -> usize {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub chart_key: String,
    #[serde(default)]
    pub refresh_interval: Option<u64>,
    #[serde(default = "default_data_length")]
    pub data_length: usize,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default, rename = "type")]
    pub chart_type: ChartType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_colors: Option<ColorPool>,
    #[serde(default)]
    pub series: Vec<ChartSeries>,
}

impl Chart {
    pub fn series_index(&self, uuid: &str) -> Option<usize> {
        self.series.iter().position(|s| s.uuid == uuid)
    }

    fn held_colors(&self) -> impl Iterator<Item = ColorName> + '_ {
        self.series.iter().filter_map(|s| s.colors.as_ref().map(|c| c.name))
    }

    /// Take the next color, reseeding the pool when it is absent or exhausted.
    ///
    /// Colors already held by series are never handed out twice while the
    /// palette still has a free color.
    pub fn acquire_color(&mut self) -> ColorAssignment {
        if let Some(color) = self.available_colors.as_mut().and_then(ColorPool::acquire) {
            return color;
        }
        let mut pool = ColorPool::full_except(self.held_colors());
        let color = pool.acquire().unwrap_or_else(|| {
            ColorAssignment::of(ColorName::ALL[self.series.len() % ColorName::ALL.len()])
        });
        self.available_colors = Some(pool);
        color
    }

    /// Give a color back unless the pool or a remaining series still holds it
    pub fn release_color(&mut self, color: ColorAssignment) {
        let name = color.name;
        if self.held_colors().any(|held| held == name) {
            return;
        }
        self.available_colors.get_or_insert_with(ColorPool::default).release(color);
    }

    /// Fill in colors for series persisted before colors were stored
    pub fn assign_legacy_colors(&mut self) {
        if self.series.iter().all(|s| s.colors.is_some()) {
            return;
        }
        let mut pool = ColorPool::full_except(self.held_colors());
        let mut spare = 0usize;
        for series in self.series.iter_mut().filter(|s| s.colors.is_none()) {
            let color = pool.acquire().unwrap_or_else(|| {
                spare += 1;
                ColorAssignment::of(ColorName::ALL[spare % ColorName::ALL.len()])
            });
            series.colors = Some(color);
        }
    }
}
