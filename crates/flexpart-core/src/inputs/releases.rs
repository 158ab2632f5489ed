use crate::domain::FlexpartResult;
use crate::namelist::NamelistGroup;
use crate::settings::{ReleaseSettings, ReleaseSite};
use crate::time_window::{TimeWindow, release_chunks};

/// RELEASES: one control block, then one `&RELEASE` per chunk and site.
///
/// Chunks are emitted in time order; within a chunk, sites keep the order
/// they were resolved in.
pub fn render_releases(
    release: &TimeWindow,
    chunk_seconds: i64,
    sites: &[ReleaseSite],
    settings: &ReleaseSettings,
) -> FlexpartResult<String> {
    let species = settings
        .list_of_species
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let mut rendered = NamelistGroup::new("RELEASES_CTRL")
        .int("NSPEC", settings.list_of_species.len() as i64)
        .entry("SPECNUM_REL", species)
        .render();

    for chunk in release_chunks(release, chunk_seconds)? {
        let [begin_date, begin_time] = chunk.beginning_pair();
        let [end_date, end_time] = chunk.ending_pair();
        for site in sites {
            let block = NamelistGroup::new("RELEASE")
                .entry("IDATE1", begin_date.clone())
                .entry("ITIME1", begin_time.clone())
                .entry("IDATE2", end_date.clone())
                .entry("ITIME2", end_time.clone())
                .real("LON1", site.longitude_of_lower_left_corner)
                .real("LON2", site.longitude_of_upper_right_corner)
                .real("LAT1", site.latitude_of_lower_left_corner)
                .real("LAT2", site.latitude_of_upper_right_corner)
                .real("Z1", site.lower_z_level)
                .real("Z2", site.upper_z_level)
                .int("ZKIND", site.level_type)
                .reals("MASS", &settings.mass_per_release)
                .int("PARTS", settings.particles_per_release)
                .quoted("COMMENT", &site.name);
            rendered.push_str(&block.render());
        }
    }
    Ok(rendered)
}
