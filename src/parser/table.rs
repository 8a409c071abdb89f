use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::EtlError;

static PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_:.-]*)\s*=\s*(.*?)\s*$").unwrap());
static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// Attribute criterion used to pick a `<table>`, e.g. `class=wikitable`.
///
/// `class` matches when the element's class list contains the value; every
/// other attribute must match exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSelector {
    attrs: Vec<(String, String)>,
}

impl TableSelector {
    pub fn new<K: Into<String>, V: Into<String>>(attrs: impl IntoIterator<Item = (K, V)>) -> Self {
        TableSelector {
            attrs: attrs
                .into_iter()
                .map(|(k, v)| (k.into().to_ascii_lowercase(), v.into()))
                .collect(),
        }
    }

    fn matches(&self, el: &ElementRef) -> bool {
        let node = el.value();
        self.attrs.iter().all(|(name, expected)| {
            if name == "class" {
                node.classes().any(|c| c == expected)
            } else {
                node.attr(name) == Some(expected.as_str())
            }
        })
    }
}

impl FromStr for TableSelector {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut attrs = Vec::new();
        for part in s.split(',').filter(|p| !p.trim().is_empty()) {
            let caps = PAIR_RE
                .captures(part)
                .ok_or_else(|| EtlError::InvalidSelector(s.to_string()))?;
            attrs.push((caps[1].to_string(), caps[2].to_string()));
        }
        if attrs.is_empty() {
            return Err(EtlError::InvalidSelector(s.to_string()));
        }
        Ok(TableSelector::new(attrs))
    }
}

impl fmt::Display for TableSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .attrs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{}", pairs.join(","))
    }
}

/// Finds the first table matching `selector` and returns the `<td>` text of
/// each of its rows, header row included. `None` if no table matches.
pub fn table_rows(document: &str, selector: &TableSelector) -> Option<Vec<Vec<String>>> {
    let html = Html::parse_document(document);
    let table = html.select(&TABLE_SEL).find(|t| selector.matches(t))?;

    let rows = table
        .select(&ROW_SEL)
        .map(|tr| {
            tr.select(&CELL_SEL)
                .map(|td| td.text().collect::<String>())
                .collect()
        })
        .collect();
    Some(rows)
}
