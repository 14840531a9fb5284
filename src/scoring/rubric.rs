use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// One rubric row: a named, weighted item a transcript is evaluated against.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub id: String,
    pub name: String,
    /// Label describing what is measured; passed through to output untouched.
    pub metric: String,
    /// Reference text for semantic comparison; may be empty.
    pub description: String,
    /// Lowercased, deduplicated, order-of-first-appearance.
    pub keywords: Vec<String>,
    pub weight: f64,
    pub min_words: Option<usize>,
    pub max_words: Option<usize>,
}

/// Immutable, ordered criterion catalog loaded once at startup.
#[derive(Debug, Clone)]
pub struct Rubric {
    criteria: Vec<Criterion>,
}

#[derive(Debug)]
pub enum RubricError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingColumn(&'static str),
    InvalidWeight { id: String, value: String },
    InvalidWordBound { id: String, value: String },
    InconsistentBounds { id: String },
    Empty,
}

impl std::fmt::Display for RubricError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RubricError::Io(err) => write!(f, "failed to read rubric: {}", err),
            RubricError::Csv(err) => write!(f, "invalid rubric CSV data: {}", err),
            RubricError::MissingColumn(column) => {
                write!(f, "rubric is missing required column '{}'", column)
            }
            RubricError::InvalidWeight { id, value } => write!(
                f,
                "criterion '{}' has weight '{}', expected a positive number",
                id, value
            ),
            RubricError::InvalidWordBound { id, value } => write!(
                f,
                "criterion '{}' has word bound '{}', expected a non-negative integer",
                id, value
            ),
            RubricError::InconsistentBounds { id } => {
                write!(f, "criterion '{}' has min_words greater than max_words", id)
            }
            RubricError::Empty => write!(f, "rubric contains no criteria"),
        }
    }
}

impl std::error::Error for RubricError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RubricError::Io(err) => Some(err),
            RubricError::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RubricError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RubricError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

const REQUIRED_COLUMNS: [&str; 4] = ["criterion_id", "criteria", "metric", "weight"];

#[derive(Debug, Deserialize)]
struct RubricRow {
    criterion_id: String,
    criteria: String,
    metric: String,
    weight: String,
    #[serde(default)]
    details: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    keywords: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    min_words: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    max_words: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_keywords(raw: Option<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.unwrap_or_default()
        .split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

fn parse_word_bound(raw: Option<&str>, id: &str) -> Result<Option<usize>, RubricError> {
    raw.map(|value| {
        value
            .trim()
            .parse::<usize>()
            .map_err(|_| RubricError::InvalidWordBound {
                id: id.to_owned(),
                value: value.to_owned(),
            })
    })
    .transpose()
}

impl Rubric {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RubricError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RubricError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        for required in REQUIRED_COLUMNS {
            if !headers.iter().any(|header| header == required) {
                return Err(RubricError::MissingColumn(required));
            }
        }

        let mut criteria = Vec::new();
        for record in csv_reader.deserialize::<RubricRow>() {
            let row = record?;
            let id = row.criterion_id;

            let weight = row
                .weight
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|weight| *weight > 0.0 && weight.is_finite())
                .ok_or_else(|| RubricError::InvalidWeight {
                    id: id.clone(),
                    value: row.weight.clone(),
                })?;

            let min_words = parse_word_bound(row.min_words.as_deref(), &id)?;
            let max_words = parse_word_bound(row.max_words.as_deref(), &id)?;
            if let (Some(min), Some(max)) = (min_words, max_words) {
                if min > max {
                    return Err(RubricError::InconsistentBounds { id });
                }
            }

            criteria.push(Criterion {
                name: row.criteria,
                metric: row.metric,
                description: row.details.unwrap_or_default(),
                keywords: parse_keywords(row.keywords.as_deref()),
                weight,
                min_words,
                max_words,
                id,
            });
        }

        if criteria.is_empty() {
            return Err(RubricError::Empty);
        }

        Ok(Self { criteria })
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Positive by construction: every weight is positive and the catalog is
    /// non-empty.
    pub fn total_weight(&self) -> f64 {
        self.criteria.iter().map(|criterion| criterion.weight).sum()
    }
}
