pub mod ledger;
pub mod feed;
pub mod in_memory;
pub mod lifecycle;
pub mod workflow;
pub mod poller;
pub mod session;

pub use ledger::{RequestLedger, SupabaseRequestLedger};
pub use feed::{NotificationFeed, SupabaseNotificationFeed};
pub use in_memory::InMemoryConsultationStore;
pub use lifecycle::RequestLifecycleService;
pub use workflow::ConsultationWorkflow;
pub use poller::{NotificationPoller, PollerHandle};
pub use session::{ConsultationSession, SessionRegistry, SessionTimings};
