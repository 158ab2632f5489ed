//! Model families and the per-date dispatch gates derived from them.

use crate::domain::ModelFamily;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REGIONAL_MODELS: [&str; 3] = ["cosmo7", "cosmo1", "kenda1"];
pub const DEFAULT_GLOBAL_MODELS: [&str; 4] = ["IFS_GL_05", "IFS_GL_1", "IFS_EU_02", "IFS_EU_01"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelFamilies {
    pub regional: Vec<String>,
    pub global: Vec<String>,
}

impl Default for ModelFamilies {
    fn default() -> Self {
        Self {
            regional: DEFAULT_REGIONAL_MODELS.iter().map(ToString::to_string).collect(),
            global: DEFAULT_GLOBAL_MODELS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl ModelFamilies {
    pub fn members(&self, family: ModelFamily) -> &[String] {
        match family {
            ModelFamily::Regional => &self.regional,
            ModelFamily::Global => &self.global,
        }
    }

    pub fn family_of(&self, model: &str) -> Option<ModelFamily> {
        [ModelFamily::Regional, ModelFamily::Global]
            .into_iter()
            .find(|family| self.members(*family).iter().any(|member| member == model))
    }

    /// True when every model belongs to `family`; vacuously true for an empty list.
    pub fn all_in(&self, models: &[String], family: ModelFamily) -> bool {
        let members = self.members(family);
        models.iter().all(|model| members.contains(model))
    }
}

/// Branches the orchestrator may take for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DispatchGates {
    pub run_regional: bool,
    pub run_global: bool,
    pub offline_continuation: bool,
}

impl DispatchGates {
    pub fn compute(
        families: &ModelFamilies,
        main: &[String],
        offline: &[String],
        offline_integration_time: i64,
    ) -> Self {
        let run_regional = !main.is_empty() && families.all_in(main, ModelFamily::Regional);

        // Grouped as `A || (B && C && D)`: when every main model is global the
        // offline list is not consulted at all.
        let run_global = families.all_in(main, ModelFamily::Global)
            || (families.all_in(offline, ModelFamily::Global)
                && !main.is_empty()
                && !offline.is_empty());

        Self {
            run_regional,
            run_global,
            offline_continuation: offline_integration_time > 0,
        }
    }

    pub fn is_noop(&self) -> bool {
        !self.run_regional && !self.run_global
    }
}

/// Family whose staging script serves a staging step.
///
/// Offline continuations always stage with the global script; otherwise the
/// global script is used only when every main model is global.
pub fn stager_family(families: &ModelFamilies, main: &[String], continuation: bool) -> ModelFamily {
    if continuation || (!main.is_empty() && families.all_in(main, ModelFamily::Global)) {
        ModelFamily::Global
    } else {
        ModelFamily::Regional
    }
}

#[cfg(test)]
mod tests {
    use super::{DispatchGates, ModelFamilies, stager_family};
    use crate::domain::ModelFamily;

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn regional_family_list_runs_regional_only() {
        let families = ModelFamilies::default();
        let gates = DispatchGates::compute(&families, &families.regional, &[], 0);
        assert!(gates.run_regional);
        assert!(!gates.run_global);
        assert!(!gates.offline_continuation);
    }

    #[test]
    fn global_family_list_without_offline_runs_global() {
        let families = ModelFamilies::default();
        let gates = DispatchGates::compute(&families, &families.global, &[], 0);
        assert!(gates.run_global);
        assert!(!gates.run_regional);
    }

    #[test]
    fn regional_main_with_global_offline_runs_both() {
        let families = ModelFamilies::default();
        let gates =
            DispatchGates::compute(&families, &models(&["cosmo7"]), &models(&["IFS_GL_05"]), 48);
        assert!(gates.run_regional);
        assert!(gates.run_global);
        assert!(gates.offline_continuation);
    }

    #[test]
    fn empty_main_list_still_opens_global_gate() {
        let families = ModelFamilies::default();
        let gates = DispatchGates::compute(&families, &[], &models(&["cosmo7"]), 0);
        assert!(!gates.run_regional);
        assert!(gates.run_global);
    }

    #[test]
    fn mixed_main_list_with_regional_offline_is_noop() {
        let families = ModelFamilies::default();
        let gates = DispatchGates::compute(
            &families,
            &models(&["cosmo7", "IFS_GL_05"]),
            &models(&["kenda1"]),
            0,
        );
        assert!(gates.is_noop());
    }

    #[test]
    fn unknown_model_belongs_to_no_family() {
        let families = ModelFamilies::default();
        assert_eq!(families.family_of("cosmo1"), Some(ModelFamily::Regional));
        assert_eq!(families.family_of("IFS_EU_01"), Some(ModelFamily::Global));
        assert_eq!(families.family_of("wrf"), None);
    }

    #[test]
    fn stager_follows_main_family_unless_continuing() {
        let families = ModelFamilies::default();
        assert_eq!(
            stager_family(&families, &models(&["cosmo7"]), false),
            ModelFamily::Regional
        );
        assert_eq!(
            stager_family(&families, &models(&["IFS_GL_1"]), false),
            ModelFamily::Global
        );
        assert_eq!(
            stager_family(&families, &models(&["cosmo7"]), true),
            ModelFamily::Global
        );
        assert_eq!(stager_family(&families, &[], false), ModelFamily::Regional);
    }
}
