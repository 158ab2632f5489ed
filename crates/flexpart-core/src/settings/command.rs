use super::SettingsError;
use crate::domain::{Direction, SettingsResult};
use serde::{Deserialize, Serialize};

/// Options of the FLEXPART COMMAND file.
///
/// Dates and age class are not part of the settings: they are derived per
/// simulation date and passed to the calculation alongside these values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub simulation_direction: i64,
    pub release_chunk: i64,
    pub release_duration: i64,
    pub output_every_seconds: i64,
    pub time_average_of_output_seconds: i64,
    pub sampling_rate_of_output: i64,
    pub particle_splitting_time_constant: i64,
    pub synchronisation_interval: i64,
    pub smaller_than_tl_factor: f64,
    pub vertical_motion_time_decrease: i64,
    pub concentration_output: i64,
    pub particle_dump: i64,
    pub subgrid_terrain_effect_parameterization: bool,
    pub convection_parametrization: i64,
    pub age_spectra: bool,
    pub dumped_particle_data: bool,
    pub output_for_each_release: bool,
    pub calculate_fluxes: bool,
    pub domain_filling_trajectory: i64,
    pub concentration_units_at_source: i64,
    pub concentration_units_at_receptor: i64,
    pub quasilagrangian_mode_to_track_particles: bool,
    pub nested_output: bool,
    pub cosmo_model_mixing_height: bool,
    pub cosmo_grid_relaxation_zone_width: f64,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            simulation_direction: -1,
            release_chunk: 3 * 3600,
            release_duration: 24 * 3600,
            output_every_seconds: 10800,
            time_average_of_output_seconds: 10800,
            sampling_rate_of_output: 60,
            particle_splitting_time_constant: 999_999_999,
            synchronisation_interval: 60,
            smaller_than_tl_factor: 2.0,
            vertical_motion_time_decrease: 4,
            concentration_output: 9,
            particle_dump: 4,
            subgrid_terrain_effect_parameterization: true,
            convection_parametrization: 2,
            age_spectra: true,
            dumped_particle_data: false,
            output_for_each_release: true,
            calculate_fluxes: false,
            domain_filling_trajectory: 0,
            concentration_units_at_source: 1,
            concentration_units_at_receptor: 2,
            quasilagrangian_mode_to_track_particles: false,
            nested_output: true,
            cosmo_model_mixing_height: false,
            cosmo_grid_relaxation_zone_width: 50.0,
        }
    }
}

impl CommandSettings {
    /// Deserializes `base` after applying each overlay with dictionary-update
    /// semantics: later layers replace keys of earlier ones.
    pub fn from_layers(
        base: &serde_yaml::Mapping,
        overlays: &[&serde_yaml::Mapping],
    ) -> SettingsResult<Self> {
        let mut merged = base.clone();
        for overlay in overlays {
            for (key, value) in overlay.iter() {
                merged.insert(key.clone(), value.clone());
            }
        }

        let settings: Self = serde_yaml::from_value(serde_yaml::Value::Mapping(merged))
            .map_err(|source| SettingsError::Section {
                section: "command",
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn direction(&self) -> Direction {
        Direction::from_sign(self.simulation_direction)
    }

    pub fn validate(&self) -> SettingsResult<()> {
        if self.release_duration < 0 {
            return Err(SettingsError::Invalid(format!(
                "command.release_duration must not be negative, got {}",
                self.release_duration
            ))
            .into());
        }
        if self.release_chunk <= 0 {
            return Err(SettingsError::Invalid(format!(
                "command.release_chunk must be positive, got {}",
                self.release_chunk
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CommandSettings;
    use crate::domain::{Direction, FlexpartErrorCategory};

    fn mapping(source: &str) -> serde_yaml::Mapping {
        serde_yaml::from_str(source).expect("mapping should parse")
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let settings = CommandSettings::from_layers(&mapping("simulation_direction: 1"), &[])
            .expect("settings should load");
        assert_eq!(settings.direction(), Direction::Forward);
        assert_eq!(settings.release_chunk, 10800);
        assert_eq!(settings.particle_dump, 4);
        assert!(settings.age_spectra);
    }

    #[test]
    fn overlays_replace_base_keys_in_order() {
        let base = mapping("convection_parametrization: 2\nrelease_duration: 3600");
        let meteo = mapping("convection_parametrization: 1");
        let offline = mapping("dumped_particle_data: true\nconvection_parametrization: 0");

        let settings = CommandSettings::from_layers(&base, &[&meteo, &offline])
            .expect("settings should load");
        assert_eq!(settings.convection_parametrization, 0);
        assert_eq!(settings.release_duration, 3600);
        assert!(settings.dumped_particle_data);

        let untouched = CommandSettings::from_layers(&base, &[]).expect("base should load");
        assert_eq!(untouched.convection_parametrization, 2);
    }

    #[test]
    fn unknown_keys_such_as_dates_are_ignored() {
        let settings = CommandSettings::from_layers(
            &mapping("simulation_date: '2021-01-01 00:00:00'\nage_class: 86400"),
            &[],
        )
        .expect("date keys are derived elsewhere");
        assert_eq!(settings, CommandSettings::default());
    }

    #[test]
    fn wrong_types_are_input_errors() {
        let error = CommandSettings::from_layers(&mapping("release_chunk: three"), &[])
            .expect_err("string chunk should fail");
        assert_eq!(error.category(), FlexpartErrorCategory::InputValidationError);
        assert!(error.message().contains("command"));
    }

    #[test]
    fn zero_release_chunk_is_rejected() {
        let error = CommandSettings::from_layers(&mapping("release_chunk: 0"), &[])
            .expect_err("zero chunk should fail");
        assert_eq!(error.placeholder(), "INPUT.SETTINGS");
    }
}
