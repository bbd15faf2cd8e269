//! Sales leads: public intake, admin triage, listing.

pub mod lead;
pub mod query;

pub use lead::{
    Lead, LeadChanges, LeadNote, LeadStatus, LeadSubmission, LeadUpdate, NewLead, NoteInput,
    DEFAULT_SOURCE,
};
pub use query::{LeadQuery, Page, Pagination};
