//! Census reference data: datasets, geographies and tabulated values.

use std::collections::BTreeMap;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusDataset {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusSource {
    pub id: i64,
    pub dataset_id: i64,
    pub name: String,
    pub url: Option<String>,
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusGeography {
    pub id: i64,
    pub dataset_id: i64,
    pub source_id: i64,
    pub layer_name: String,
    pub geoid: String,
    pub name: Option<String>,
    pub aland: Option<f64>,
    pub awater: Option<f64>,
    /// ISO codes of the country / first-level subdivision this geography sits in.
    pub adm0_iso: Option<String>,
    pub adm1_iso: Option<String>,
    pub geometry: Option<MultiPolygon<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusTable {
    pub id: i64,
    pub dataset_id: i64,
    pub table_name: String,
    pub table_title: String,
    pub table_group: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusField {
    pub id: i64,
    pub table_id: i64,
    pub field_name: String,
    pub field_title: String,
    pub column_order: f64,
}

/// One table's values for one geography.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusValue {
    pub geoid: String,
    pub table_id: i64,
    pub values: BTreeMap<String, f64>,
}

/// Which kind of entity a census-geography lookup starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CensusEntityKind {
    Stop,
    Route,
    Agency,
}
