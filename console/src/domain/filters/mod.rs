//! Audience filter expression model
//!
//! - `catalog` - field registry built from backend criteria blocks
//! - `criteria`, `group`, `expression` - the nested boolean filter
//! - `workspace` - the two independent filter contexts
//! - `payload` - estimate and saved-filter wire shapes
//! - `definition` - declarative filter files replayed as builder commands
//! - `save` - validation stages and the save pipeline
//! - `evaluate` - local evaluation against audience profiles
//! - `custom_field` - user-defined criteria blocks
//! - `notices` - timed user-facing messages
//! - `session` - builder facade tying it all together

pub mod catalog;
pub mod criteria;
pub mod custom_field;
pub mod definition;
pub mod error;
pub mod evaluate;
pub mod expression;
pub mod group;
pub mod notices;
pub mod operators;
pub mod payload;
pub mod save;
pub mod session;
pub mod workspace;

pub use catalog::{CatalogEntry, FieldCatalog, FieldDefinition, TypeCounts};
pub use criteria::CriteriaInstance;
pub use custom_field::{CustomFieldError, CustomFieldRequest};
pub use definition::{CriterionDefinition, FilterDefinition, GroupDefinition};
pub use error::FilterError;
pub use evaluate::{Profile, count_matches, profile_from_json};
pub use expression::{FilterCommand, FilterExpression, GroupIdPolicy};
pub use group::{CriteriaUpdate, Group};
pub use notices::{NoticeBoard, NoticeChannel};
pub use operators::{DataType, LogicalOperator, Operator};
pub use payload::{ConditionPayload, CriterionPayload, EstimateRequest, GroupRef, SavedFilter};
pub use save::{FilterDetails, SaveError, SaveMode, SaveOutcome, SaveService, ValidationErrors};
pub use session::{BuilderSession, SessionSettings};
pub use workspace::{FilterContext, FilterWorkspace};
