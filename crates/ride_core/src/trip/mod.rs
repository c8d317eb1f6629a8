//! Trip orchestrator (component G): event-sourced aggregate state machine.

pub mod events;
pub mod model;
pub mod orchestrator;
pub mod payment;

pub use events::{apply, replay_onto, TripEvent, TripEventKind};
pub use model::{ActorKind, Trip, TripStatus};
pub use orchestrator::TripOrchestrator;
pub use payment::{PaymentOutcome, PaymentProvider, PaymentRequest, WalletPaymentProvider};
