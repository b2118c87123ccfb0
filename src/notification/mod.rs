//! Notification model, payload construction and fan-out dispatch.
//!
//! A batch flows through:
//! 1. `NotificationIntent` - what the caller asked for
//! 2. `PayloadBuilder` - resolves the deep link and builds the shared `NotificationPayload`
//! 3. `PushDispatcher` - per recipient: directory lookup, concurrent delivery, retirement
//! 4. `BatchSummary` - commutative fold of every `DeliveryOutcome`

mod deep_link;
mod dispatcher;
mod payload;
mod summary;
mod types;

pub use deep_link::{profile_for, ActionSpec, DeepLinkResolver, KindProfile, LinkParam};
pub use dispatcher::{DispatchError, DispatcherStats, DispatcherStatsSnapshot, PushDispatcher};
pub use payload::{NotificationAction, NotificationPayload, PayloadBuilder};
pub use summary::{BatchSummary, DeliveryOutcome};
pub use types::{NotificationIntent, NotificationKind};
