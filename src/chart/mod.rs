//! Chart documents handed to the renderer. A [`ChartSpec`] serializes directly
//! as a Vega-Lite v5 specification with its data inlined.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::info;

pub mod format;

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// d3-format strings used in tooltips and axes.
pub mod formats {
    pub const THOUSANDS: &str = ",";
    pub const TWO_DECIMALS: &str = ".2f";
    pub const GROUPED_TWO_DECIMALS: &str = ",.2f";
    pub const GROUPED_INTEGER: &str = ",.0f";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Arc,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Quantitative,
    Nominal,
    Ordinal,
}

/// One encoding channel (theta, x, y or color).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Value>,
}

impl Channel {
    pub fn new(field: &str, field_type: FieldType) -> Self {
        Self {
            field: field.to_string(),
            field_type,
            title: None,
            sort: None,
            axis: None,
            scale: None,
            legend: None,
        }
    }

    pub fn quantitative(field: &str) -> Self {
        Self::new(field, FieldType::Quantitative)
    }

    pub fn nominal(field: &str) -> Self {
        Self::new(field, FieldType::Nominal)
    }

    pub fn ordinal(field: &str) -> Self {
        Self::new(field, FieldType::Ordinal)
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// e.g. `"-x"` to order categories by the x value, descending.
    pub fn sort(mut self, sort: &str) -> Self {
        self.sort = Some(sort.to_string());
        self
    }

    pub fn axis(mut self, axis: Value) -> Self {
        self.axis = Some(axis);
        self
    }

    pub fn scale(mut self, scale: Value) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn no_legend(mut self) -> Self {
        self.legend = Some(Value::Null);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tooltip {
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Tooltip {
    pub fn text(field: &str) -> Self {
        Self {
            field: field.to_string(),
            field_type: FieldType::Nominal,
            title: None,
            format: None,
        }
    }

    pub fn number(field: &str, format: &str, title: Option<&str>) -> Self {
        Self {
            field: field.to_string(),
            field_type: FieldType::Quantitative,
            title: title.map(str::to_string),
            format: Some(format.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theta: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<Channel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Channel>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tooltip: Vec<Tooltip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub text: String,
    /// Caption lines shown under the title.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub subtitle: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineData {
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "$schema")]
    pub schema: String,
    /// Stable identifier; also the artifact file stem.
    pub name: String,
    pub title: Title,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub data: InlineData,
    pub mark: Mark,
    pub encoding: Encoding,
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub usermeta: Value,
}

impl ChartSpec {
    pub fn new(title: &str, mark: Mark) -> Self {
        Self {
            schema: VEGA_LITE_SCHEMA.to_string(),
            name: format::slugify(title),
            title: Title {
                text: title.to_string(),
                subtitle: Vec::new(),
            },
            description: String::new(),
            width: None,
            height: None,
            data: InlineData::default(),
            mark,
            encoding: Encoding::default(),
            usermeta: serde_json::json!({ "generated_at": Utc::now().to_rfc3339() }),
        }
    }

    /// Inline `rows` as the chart data; field names come from their serde names.
    pub fn rows<T: Serialize>(mut self, rows: &[T]) -> Result<Self> {
        self.data.values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("serializing rows for chart {}", self.name))?;
        Ok(self)
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn caption(mut self, line: impl Into<String>) -> Self {
        self.title.subtitle.push(line.into());
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Receives finished charts.
pub trait ChartSink {
    fn render(&mut self, chart: &ChartSpec) -> Result<()>;
}

/// Writes each chart as `<name>.vl.json` under a directory.
pub struct VegaLiteDir {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl VegaLiteDir {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating chart directory {}", dir.display()))?;
        Ok(Self {
            dir,
            written: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ChartSink for VegaLiteDir {
    fn render(&mut self, chart: &ChartSpec) -> Result<()> {
        let path = self.dir.join(format!("{}.vl.json", chart.name));
        let tmp_path = self.dir.join(format!(".{}.vl.json.tmp", chart.name));

        // write to tmp, then rename over the target
        let mut tmp = fs::File::create(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        serde_json::to_writer_pretty(&mut tmp, chart)
            .with_context(|| format!("serializing chart {}", chart.name))?;
        tmp.write_all(b"\n")?;
        drop(tmp);
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;

        info!(chart = %chart.name, path = %path.display(), "rendered chart");
        self.written.push(path);
        Ok(())
    }
}
