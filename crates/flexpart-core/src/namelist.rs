//! Fortran value formatting and namelist serialization.
//!
//! FLEXPART reads its control files with list-directed namelist input, so the
//! text produced here has to stay byte-stable: logicals as `.true.`/`.false.`,
//! reals in `d`-exponent notation and one `key = value` assignment per line.

use crate::domain::{FlexpartError, FlexpartResult};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum NamelistValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    /// Sequential values, or index tuples when an element is itself a list
    /// (`[i, j, value]` renders as `key(i,j) = value`).
    List(Vec<NamelistValue>),
    /// Values keyed by a name that the caller's mapping resolves to an index.
    Mapped(Vec<(String, NamelistValue)>),
}

impl NamelistValue {
    pub fn from_yaml(value: &serde_yaml::Value) -> FlexpartResult<Self> {
        use serde_yaml::Value;

        match value {
            Value::Bool(flag) => Ok(Self::Bool(*flag)),
            Value::Number(number) => {
                if let Some(integer) = number.as_i64() {
                    Ok(Self::Int(integer))
                } else if let Some(real) = number.as_f64() {
                    Ok(Self::Real(real))
                } else {
                    Err(FlexpartError::input_validation(
                        "INPUT.NAMELIST_VALUE",
                        format!("numeric value '{}' does not fit a Fortran integer or real", number),
                    ))
                }
            }
            Value::String(text) => Ok(Self::Str(text.clone())),
            Value::Sequence(items) => items
                .iter()
                .map(Self::from_yaml)
                .collect::<FlexpartResult<Vec<_>>>()
                .map(Self::List),
            Value::Mapping(mapping) => {
                let mut entries = Vec::with_capacity(mapping.len());
                for (key, item) in mapping {
                    let key = yaml_key(key)?;
                    entries.push((key, Self::from_yaml(item)?));
                }
                Ok(Self::Mapped(entries))
            }
            Value::Tagged(tagged) => Self::from_yaml(&tagged.value),
            Value::Null => Err(FlexpartError::input_validation(
                "INPUT.NAMELIST_VALUE",
                "null values cannot be written to a Fortran namelist",
            )),
        }
    }
}

pub(crate) fn yaml_key(key: &serde_yaml::Value) -> FlexpartResult<String> {
    match key {
        serde_yaml::Value::String(text) => Ok(text.clone()),
        serde_yaml::Value::Number(number) => Ok(number.to_string()),
        serde_yaml::Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(FlexpartError::input_validation(
            "INPUT.NAMELIST_KEY",
            format!("unsupported mapping key {:?}", other),
        )),
    }
}

/// Renders a real the way `f'{value:18.10e}'.replace('e', 'd')` does.
pub fn format_fortran_real(value: f64) -> String {
    if !value.is_finite() {
        return format!("{value:>18}");
    }

    let formatted = format!("{value:.10e}");
    let (mantissa, exponent) = formatted
        .split_once('e')
        .unwrap_or((formatted.as_str(), "0"));
    let exponent = exponent.parse::<i32>().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let token = format!("{mantissa}d{sign}{:02}", exponent.abs());
    format!("{token:>18}")
}

pub fn to_fortran(value: &NamelistValue, quote_strings: bool) -> FlexpartResult<String> {
    match value {
        NamelistValue::Bool(true) => Ok(".true.".to_string()),
        NamelistValue::Bool(false) => Ok(".false.".to_string()),
        NamelistValue::Int(integer) => Ok(integer.to_string()),
        NamelistValue::Real(real) => Ok(format_fortran_real(*real)),
        NamelistValue::Str(text) if quote_strings => Ok(format!("'{text}'")),
        NamelistValue::Str(text) => Ok(text.clone()),
        NamelistValue::List(_) | NamelistValue::Mapped(_) => Err(FlexpartError::input_validation(
            "INPUT.NAMELIST_VALUE",
            format!(
                "invalid value {:?}: only bools, ints, reals and strings are Fortran scalars",
                value
            ),
        )),
    }
}

pub fn namelist_entry(
    key: &str,
    value: &NamelistValue,
    mapping: Option<&BTreeMap<String, i64>>,
) -> FlexpartResult<String> {
    match value {
        NamelistValue::Mapped(entries) => {
            let mapping = mapping.ok_or_else(|| {
                FlexpartError::input_validation(
                    "INPUT.NAMELIST_MAPPING",
                    format!("'{key}' is a dictionary; a name-to-index mapping is required"),
                )
            })?;

            let mut lines = Vec::with_capacity(entries.len());
            for (name, item) in entries {
                let index = resolve_index(mapping, name)?;
                lines.push((index, format!("  {key}({index}) = {}\n", to_fortran(item, true)?)));
            }
            lines.sort_by(|left, right| left.0.cmp(&right.0).then_with(|| left.1.cmp(&right.1)));
            Ok(lines.into_iter().map(|(_, line)| line).collect())
        }
        NamelistValue::List(items) => {
            let mut rendered = String::new();
            for (position, item) in items.iter().enumerate() {
                let (index, scalar) = match item {
                    NamelistValue::List(tuple) => indexed_tuple(key, tuple, mapping)?,
                    scalar => ((position + 1).to_string(), scalar),
                };
                rendered.push_str(&format!("  {key}({index}) = {}\n", to_fortran(scalar, true)?));
            }
            Ok(rendered)
        }
        scalar => Ok(format!("  {key} = {}\n", to_fortran(scalar, true)?)),
    }
}

fn indexed_tuple<'a>(
    key: &str,
    tuple: &'a [NamelistValue],
    mapping: Option<&BTreeMap<String, i64>>,
) -> FlexpartResult<(String, &'a NamelistValue)> {
    let Some((value, indices)) = tuple.split_last() else {
        return Err(FlexpartError::input_validation(
            "INPUT.NAMELIST_INDEX",
            format!("'{key}' contains an empty index tuple"),
        ));
    };

    let mut tokens = Vec::with_capacity(indices.len());
    for index in indices {
        match index {
            NamelistValue::Int(integer) => tokens.push(integer.to_string()),
            NamelistValue::Str(name) => {
                let mapping = mapping.ok_or_else(|| {
                    FlexpartError::input_validation(
                        "INPUT.NAMELIST_MAPPING",
                        format!("cannot map index '{name}' of '{key}': no mapping was defined"),
                    )
                })?;
                tokens.push(resolve_index(mapping, name)?.to_string());
            }
            other => {
                return Err(FlexpartError::input_validation(
                    "INPUT.NAMELIST_INDEX",
                    format!(
                        "index tuples of '{key}' accept integers or names, got {:?}",
                        other
                    ),
                ));
            }
        }
    }
    Ok((tokens.join(","), value))
}

fn resolve_index(mapping: &BTreeMap<String, i64>, name: &str) -> FlexpartResult<i64> {
    mapping.get(name).copied().ok_or_else(|| {
        FlexpartError::input_validation(
            "INPUT.NAMELIST_MAPPING",
            format!("unable to find the key '{name}' in the mapping"),
        )
    })
}

/// A `&NAME ... /` block in the layout FLEXPART's control files use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamelistGroup {
    name: String,
    entries: Vec<(String, String)>,
}

impl NamelistGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, key: &str, token: impl Into<String>) -> Self {
        self.entries.push((key.to_string(), token.into()));
        self
    }

    pub fn int(self, key: &str, value: i64) -> Self {
        self.entry(key, value.to_string())
    }

    pub fn flag(self, key: &str, value: bool) -> Self {
        self.int(key, i64::from(value))
    }

    pub fn real(self, key: &str, value: f64) -> Self {
        self.entry(key, format_fortran_real(value).trim_start().to_string())
    }

    pub fn reals(self, key: &str, values: &[f64]) -> Self {
        let tokens = values
            .iter()
            .map(|value| format_fortran_real(*value).trim_start().to_string())
            .collect::<Vec<_>>();
        self.entry(key, tokens.join(", "))
    }

    pub fn quoted(self, key: &str, value: &str) -> Self {
        self.entry(key, format!("\"{value}\""))
    }

    pub fn render(&self) -> String {
        let width = self
            .entries
            .iter()
            .map(|(key, _)| key.len())
            .max()
            .unwrap_or(0);
        let mut rendered = format!("&{}\n", self.name);
        for (key, token) in &self.entries {
            rendered.push_str(&format!(" {key:<width$}= {token},\n"));
        }
        rendered.push_str(" /\n");
        rendered
    }
}
