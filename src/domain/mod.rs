pub mod candidate;
pub mod facility;
pub mod need;
pub mod record;
pub mod tracking;

pub use candidate::{Candidate, CANDIDATE_COLUMNS};
pub use facility::Facility;
pub use need::{Need, NeedsMet};
pub use record::{normalize_key, FieldError, Record, Value};
pub use tracking::{MailingType, TrackingEvent};
