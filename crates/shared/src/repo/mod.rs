pub mod event_repo;
pub mod rsvp_repo;

pub use event_repo::EventRepo;
pub use rsvp_repo::RsvpRepo;
