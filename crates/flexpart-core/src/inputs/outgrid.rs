use super::Dialect;
use crate::namelist::NamelistGroup;
use crate::settings::{OutgridNestSettings, OutgridSettings};

pub fn render_outgrid(outgrid: &OutgridSettings, dialect: Dialect) -> String {
    let mut group = NamelistGroup::new("OUTGRID");
    if dialect == Dialect::Cosmo {
        group = group.int("OUTGRIDDEF", outgrid.output_grid_type);
    }
    group
        .real("OUTLON0", outgrid.longitude_of_output_grid)
        .real("OUTLAT0", outgrid.latitude_of_output_grid)
        .int("NUMXGRID", outgrid.number_of_grid_points_x)
        .int("NUMYGRID", outgrid.number_of_grid_points_y)
        .real("DXOUT", outgrid.grid_distance_x)
        .real("DYOUT", outgrid.grid_distance_y)
        .reals("OUTHEIGHTS", &outgrid.heights_of_levels)
        .render()
}

pub fn render_outgrid_nest(nest: &OutgridNestSettings, dialect: Dialect) -> String {
    let mut group = NamelistGroup::new("OUTGRIDN");
    if dialect == Dialect::Cosmo {
        group = group.int("OUTGRIDDEFN", nest.output_grid_type);
    }
    group
        .real("OUTLON0N", nest.longitude_of_output_grid)
        .real("OUTLAT0N", nest.latitude_of_output_grid)
        .int("NUMXGRIDN", nest.number_of_grid_points_x)
        .int("NUMYGRIDN", nest.number_of_grid_points_y)
        .real("DXOUTN", nest.grid_distance_x)
        .real("DYOUTN", nest.grid_distance_y)
        .render()
}
