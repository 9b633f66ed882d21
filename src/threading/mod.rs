//! Multi-layer thread resolution engine.
//!
//! Groups each incoming email into its conversation thread by trying an
//! ordered sequence of matching layers, most specific first:
//!
//! 1. Provider conversation id (confidence 1.0)
//! 2. RFC 5322 reference chain: In-Reply-To, falling back to the last
//!    References entry (confidence 0.99)
//! 3. Normalized subject + participant overlap within a recency window
//!    (confidence band 0.5–0.85)
//! 4. New thread (confidence 0.0)
//!
//! The engine reads prior state only through the injected [`ThreadLookup`]
//! capability and returns plain data — persistence belongs to the caller.

pub mod layers;
pub mod lookup;
pub mod participants;
pub mod resolver;
pub mod subject;

pub use lookup::{MatchMethod, ThreadLookup, ThreadMatch};
pub use participants::{participant_overlap, participant_set, RecipientField};
pub use resolver::{ThreadResolver, ThreadingResult};
pub use subject::{clean_message_id, normalize_subject};
