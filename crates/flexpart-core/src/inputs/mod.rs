//! Text of the control files FLEXPART reads from its working directory.

pub mod outgrid;
pub mod releases;

pub use outgrid::{render_outgrid, render_outgrid_nest};
pub use releases::render_releases;

use crate::domain::{FlexpartResult, ModelFamily};
use crate::namelist::{NamelistGroup, namelist_entry};
use crate::settings::{CommandSettings, InputPhy};
use crate::time_window::SimulationPeriod;

pub const COMMAND_FILE: &str = "COMMAND";
pub const RELEASES_FILE: &str = "RELEASES";
pub const AGECLASSES_FILE: &str = "AGECLASSES";
pub const OUTGRID_FILE: &str = "OUTGRID";
pub const OUTGRID_NEST_FILE: &str = "OUTGRID_NEST";
pub const INPUT_PHY_FILE: &str = "INPUT_PHY";

/// File layout flavour: FLEXPART-COSMO reads a few keys the IFS build lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Cosmo,
    Ifs,
}

impl From<ModelFamily> for Dialect {
    fn from(family: ModelFamily) -> Self {
        match family {
            ModelFamily::Regional => Self::Cosmo,
            ModelFamily::Global => Self::Ifs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub contents: String,
}

impl InputFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

pub fn render_command(
    command: &CommandSettings,
    period: &SimulationPeriod,
    dialect: Dialect,
) -> String {
    let [begin_date, begin_time] = period.simulation.beginning_pair();
    let [end_date, end_time] = period.simulation.ending_pair();

    let mut group = NamelistGroup::new("COMMAND")
        .int("LDIRECT", command.simulation_direction)
        .entry("IBDATE", begin_date)
        .entry("IBTIME", begin_time)
        .entry("IEDATE", end_date)
        .entry("IETIME", end_time)
        .int("LOUTSTEP", command.output_every_seconds)
        .int("LOUTAVER", command.time_average_of_output_seconds)
        .int("LOUTSAMPLE", command.sampling_rate_of_output)
        .int("ITSPLIT", command.particle_splitting_time_constant)
        .int("LSYNCTIME", command.synchronisation_interval)
        .real("CTL", command.smaller_than_tl_factor)
        .int("IFINE", command.vertical_motion_time_decrease)
        .int("IOUT", command.concentration_output)
        .int("IPOUT", command.particle_dump)
        .flag("LSUBGRID", command.subgrid_terrain_effect_parameterization)
        .int("LCONVECTION", command.convection_parametrization)
        .flag("LAGESPECTRA", command.age_spectra)
        .flag("IPIN", command.dumped_particle_data)
        .flag("IOUTPUTFOREACHRELEASE", command.output_for_each_release)
        .flag("IFLUX", command.calculate_fluxes)
        .int("MDOMAINFILL", command.domain_filling_trajectory)
        .int("IND_SOURCE", command.concentration_units_at_source)
        .int("IND_RECEPTOR", command.concentration_units_at_receptor)
        .flag("MQUASILAG", command.quasilagrangian_mode_to_track_particles)
        .flag("NESTED_OUTPUT", command.nested_output);

    if dialect == Dialect::Cosmo {
        group = group
            .flag("LCOSMOHMIX", command.cosmo_model_mixing_height)
            .real("RELAXZONEWIDTH", command.cosmo_grid_relaxation_zone_width);
    }
    group.render()
}

pub fn render_ageclasses(age_class_seconds: i64) -> String {
    NamelistGroup::new("AGECLASS")
        .int("NAGECLASS", 1)
        .int("LAGE", age_class_seconds)
        .render()
}

pub fn render_input_phy(input_phy: &InputPhy) -> FlexpartResult<String> {
    let mut rendered = String::from("&parphy\n");
    for (key, value) in input_phy.entries() {
        rendered.push_str(&namelist_entry(key, value, None)?);
    }
    rendered.push_str("/\n");
    Ok(rendered)
}
