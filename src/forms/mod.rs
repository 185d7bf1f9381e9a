//! HAL-FORMS interpretation and interaction.
//!
//! - [`options`] - option resolution (inline or linked)
//! - [`path`] - structured field paths into form values
//! - [`template`] - initial values and validation rules
//! - [`fields`] - field renderer registry
//! - [`target`] - target data resolution
//! - [`submit`] - submission and error classification
//! - [`request`] - active form request
//! - [`session`] - form state and the display controller

pub mod fields;
pub mod options;
pub mod path;
pub mod request;
pub mod session;
pub mod submit;
pub mod target;
pub mod template;

pub use fields::{FieldFactory, FieldKind, FieldProps, FieldRegistry, RenderedField};
pub use options::{OptionResolver, OptionsState, SelectOption, convert_options};
pub use path::{FieldPath, PathSegment};
pub use request::{FormOrigin, FormRequest, FormRequestController};
pub use session::{FormDisplay, FormSession, OpenForm, SubmitOutcome, SuccessCallback};
pub use submit::{SubmissionPipeline, SubmitError};
pub use target::{TargetDataResolver, TargetPhase, TargetState};
pub use template::{FieldRule, RuleKind, ValidationRules, build_validation_rules, compute_initial_values};
