pub mod subscriptions;

pub use subscriptions::{MutationOutcome, SubscriptionService};
