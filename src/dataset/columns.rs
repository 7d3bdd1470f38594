use crate::config::ColumnOverrides;
use crate::dataset::utils::clean_str;
use crate::error::{ReportError, ReportResult};

/// Logical columns of the population table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Region,
    Population,
    NetChange,
    Density,
    UrbanPercent,
    YearlyChangePercent,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Name,
        Field::Region,
        Field::Population,
        Field::NetChange,
        Field::Density,
        Field::UrbanPercent,
        Field::YearlyChangePercent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Region => "region",
            Field::Population => "population",
            Field::NetChange => "net_change",
            Field::Density => "density",
            Field::UrbanPercent => "urban_percent",
            Field::YearlyChangePercent => "yearly_change_percent",
        }
    }

    /// Header spellings seen across published copies of the dataset.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::Name => &["Country or Dependency", "Country (or dependency)", "Country"],
            Field::Region => &["Regions", "Region"],
            Field::Population => &["Population(2020)", "Population (2020)", "Population"],
            Field::NetChange => &["Net Change"],
            Field::Density => &["Density(p/km^2)", "Density (P/Km²)", "Density"],
            Field::UrbanPercent => &["Urban", "Urban Pop %", "Urban Pop"],
            Field::YearlyChangePercent => &["Yearly Change"],
        }
    }

    fn override_in<'a>(&self, o: &'a ColumnOverrides) -> Option<&'a str> {
        match self {
            Field::Name => o.name.as_deref(),
            Field::Region => o.region.as_deref(),
            Field::Population => o.population.as_deref(),
            Field::NetChange => o.net_change.as_deref(),
            Field::Density => o.density.as_deref(),
            Field::UrbanPercent => o.urban_percent.as_deref(),
            Field::YearlyChangePercent => o.yearly_change_percent.as_deref(),
        }
    }
}

fn normalize_header(h: &str) -> String {
    clean_str(h.trim_start_matches('\u{feff}')).to_lowercase()
}

/// Index of every logical column in the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    indices: [usize; 7],
    headers: Vec<String>,
}

impl ColumnMap {
    pub fn resolve(headers: &[String], overrides: &ColumnOverrides) -> ReportResult<Self> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
        let mut indices = [0usize; 7];

        for (slot, field) in Field::ALL.iter().enumerate() {
            let candidates: Vec<&str> = field
                .override_in(overrides)
                .into_iter()
                .chain(field.aliases().iter().copied())
                .collect();

            let found = candidates.iter().find_map(|cand| {
                let want = normalize_header(cand);
                normalized.iter().position(|h| *h == want)
            });

            match found {
                Some(idx) => indices[slot] = idx,
                None => {
                    return Err(ReportError::MissingColumn {
                        column: field.as_str(),
                        tried: candidates.join(", "),
                    })
                }
            }
        }

        Ok(Self {
            indices,
            headers: headers.iter().map(|h| clean_str(h).to_string()).collect(),
        })
    }

    pub fn index(&self, field: Field) -> usize {
        self.indices[field as usize]
    }

    /// Header text as written in the file, for error messages.
    pub fn header(&self, field: Field) -> &str {
        &self.headers[self.index(field)]
    }

    pub fn cell<'r>(&self, fields: &'r [String], field: Field) -> &'r str {
        fields
            .get(self.index(field))
            .map(String::as_str)
            .unwrap_or("")
    }
}
