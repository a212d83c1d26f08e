//! Application services. Each one owns the rules for one aggregate and talks to
//! storage only through the port traits.

pub mod groups;
pub mod instantiation;
pub mod plans;
pub mod sessions;

pub use groups::{GroupService, NewTrainingGroup, SetTemplateInput, TrainingGroupPatch};
pub use instantiation::InstantiationService;
pub use plans::{NewPlan, PlanDetails, PlanEntry, PlanPatch, PlanService};
pub use sessions::{NewRecord, NewSession, NewSetRecord, SessionPatch, SessionService, SetRecordPatch};

use crate::domain::MAX_COUNT;
use crate::ports::{PortError, PortResult};

fn check_count(field: &str, value: Option<u32>) -> PortResult<()> {
    match value {
        Some(v) if v > MAX_COUNT => Err(PortError::Validation(format!(
            "{} must not exceed {}",
            field, MAX_COUNT
        ))),
        _ => Ok(()),
    }
}
