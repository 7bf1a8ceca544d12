//! Arandu Review Pipeline
//!
//! A DAG of nodes over a shared review state:
//!
//! ```text
//! ingestion -> claim_extraction -> { citation_suggestion, checklist_generation }
//!                               -> quality_score -> badge_generation -> report_generation
//! ```
//!
//! Nodes tolerate partial failure: a node error lands in the state's error
//! list and downstream nodes run on degraded inputs. Only a node whose
//! required inputs are unusable fails the review.

pub mod badges;
pub mod checklist;
pub mod citations;
pub mod claims;
pub mod ingestion;
pub mod llm;
pub mod pdf;
pub mod pipeline;
pub mod processor;
pub mod quality;
pub mod report;
pub mod segmenter;
pub mod state;

pub use pipeline::ReviewPipeline;
pub use processor::ReviewProcessor;
pub use state::{ReviewState, StepError};
