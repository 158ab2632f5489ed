use super::SettingsError;
use crate::domain::SettingsResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_LEVEL_KEY: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseSettings {
    pub particles_per_release: i64,
    pub mass_per_release: Vec<f64>,
    pub list_of_species: Vec<i64>,
}

impl ReleaseSettings {
    pub fn validate(&self) -> SettingsResult<()> {
        if self.list_of_species.is_empty() {
            return Err(SettingsError::Invalid(
                "release_settings.list_of_species must name at least one species".to_string(),
            )
            .into());
        }
        if self.mass_per_release.len() != self.list_of_species.len() {
            return Err(SettingsError::Invalid(format!(
                "release_settings lists {} masses for {} species",
                self.mass_per_release.len(),
                self.list_of_species.len()
            ))
            .into());
        }
        if self.particles_per_release <= 0 {
            return Err(SettingsError::Invalid(format!(
                "release_settings.particles_per_release must be positive, got {}",
                self.particles_per_release
            ))
            .into());
        }
        Ok(())
    }
}

/// Receptor site as configured: a point with per-model release heights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
    pub level: BTreeMap<String, f64>,
    pub level_type: BTreeMap<String, i64>,
}

/// A location resolved for one model, in the shape RELEASES expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseSite {
    pub name: String,
    pub longitude_of_lower_left_corner: f64,
    pub longitude_of_upper_right_corner: f64,
    pub latitude_of_lower_left_corner: f64,
    pub latitude_of_upper_right_corner: f64,
    pub lower_z_level: f64,
    pub upper_z_level: f64,
    pub level_type: i64,
}

impl Location {
    pub fn site_for_model(&self, name: &str, model: &str) -> SettingsResult<ReleaseSite> {
        let level = self
            .level
            .get(model)
            .or_else(|| self.level.get(DEFAULT_LEVEL_KEY))
            .copied()
            .ok_or_else(|| {
                SettingsError::Invalid(format!(
                    "location '{name}' has no level for model '{model}' and no '{DEFAULT_LEVEL_KEY}' level"
                ))
            })?;
        let level_type = self.level_type.get(model).copied().ok_or_else(|| {
            SettingsError::Invalid(format!(
                "location '{name}' has no level_type for model '{model}'"
            ))
        })?;

        Ok(ReleaseSite {
            name: name.to_string(),
            longitude_of_lower_left_corner: self.longitude,
            longitude_of_upper_right_corner: self.longitude,
            latitude_of_lower_left_corner: self.latitude,
            latitude_of_upper_right_corner: self.latitude,
            lower_z_level: level,
            upper_z_level: level,
            level_type,
        })
    }
}

pub type Locations = BTreeMap<String, Location>;

/// Resolves every location for `model`, in name order.
pub fn reformat_locations(locations: &Locations, model: &str) -> SettingsResult<Vec<ReleaseSite>> {
    locations
        .iter()
        .map(|(name, location)| location.site_for_model(name, model))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Location, Locations, ReleaseSettings, reformat_locations};
    use std::collections::BTreeMap;

    fn jfj() -> Location {
        Location {
            longitude: 7.985,
            latitude: 46.548,
            level: BTreeMap::from([("default".to_string(), 3000.0), ("cosmo7".to_string(), 1000.0)]),
            level_type: BTreeMap::from([("cosmo7".to_string(), 2), ("IFS_GL_05".to_string(), 1)]),
        }
    }

    #[test]
    fn site_collapses_corners_onto_point() {
        let site = jfj().site_for_model("JFJ_5magl", "cosmo7").expect("site");
        assert_eq!(site.longitude_of_lower_left_corner, 7.985);
        assert_eq!(site.longitude_of_upper_right_corner, 7.985);
        assert_eq!(site.latitude_of_lower_left_corner, 46.548);
        assert_eq!(site.latitude_of_upper_right_corner, 46.548);
        assert_eq!(site.lower_z_level, 1000.0);
        assert_eq!(site.upper_z_level, 1000.0);
        assert_eq!(site.level_type, 2);
    }

    #[test]
    fn missing_model_level_falls_back_to_default() {
        let site = jfj().site_for_model("JFJ_5magl", "IFS_GL_05").expect("site");
        assert_eq!(site.lower_z_level, 3000.0);
        assert_eq!(site.level_type, 1);
    }

    #[test]
    fn level_type_is_required_for_model() {
        let error = jfj()
            .site_for_model("JFJ_5magl", "kenda1")
            .expect_err("kenda1 has no level type");
        assert!(error.message().contains("level_type"));
        assert!(error.message().contains("kenda1"));
    }

    #[test]
    fn locations_are_resolved_in_name_order() {
        let locations: Locations =
            BTreeMap::from([("TRN".to_string(), jfj()), ("BEO".to_string(), jfj())]);
        let sites = reformat_locations(&locations, "cosmo7").expect("sites");
        let names = sites.iter().map(|site| site.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["BEO", "TRN"]);
    }

    #[test]
    fn masses_must_match_species() {
        let settings = ReleaseSettings {
            particles_per_release: 50000,
            mass_per_release: vec![1.0, 2.0],
            list_of_species: vec![1],
        };
        assert!(settings.validate().is_err());
    }
}
