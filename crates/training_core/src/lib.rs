pub mod domain;
pub mod memory;
pub mod paging;
pub mod ports;
pub mod services;
pub mod sets;

pub use domain::{
    ExerciseRecord, ExerciseSession, PlanGroupAssociation, PlanStatus, SessionStatus, SetRecord,
    SetTemplate, TrainingGroup, TrainingPlan,
};
pub use paging::{Page, PageRequest, SortOrder};
pub use ports::{
    ExerciseCatalog, GroupQuery, GroupSortField, PlanQuery, PlanStore, PortError, PortResult,
    SessionQuery, SessionStore, TrainingGroupStore,
};
