use serde::{Deserialize, Serialize};

/// Main output grid, written to OUTGRID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgridSettings {
    #[serde(default)]
    pub output_grid_type: i64,
    pub longitude_of_output_grid: f64,
    pub latitude_of_output_grid: f64,
    pub number_of_grid_points_x: i64,
    pub number_of_grid_points_y: i64,
    pub grid_distance_x: f64,
    pub grid_distance_y: f64,
    pub heights_of_levels: Vec<f64>,
}

/// Nested output grid, written to OUTGRID_NEST when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgridNestSettings {
    #[serde(default)]
    pub output_grid_type: i64,
    pub longitude_of_output_grid: f64,
    pub latitude_of_output_grid: f64,
    pub number_of_grid_points_x: i64,
    pub number_of_grid_points_y: i64,
    pub grid_distance_x: f64,
    pub grid_distance_y: f64,
}
