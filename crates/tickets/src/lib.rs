//! Tickets domain module.
//!
//! A ticket is the fulfillment record derived from an accepted quotation,
//! linked by reference number rather than by foreign key. This crate holds
//! the record, its status lifecycle and the synchronization/recomputation
//! contract; orchestration lives in the infrastructure layer.

pub mod ticket;

pub use ticket::{ShippingAddress, StatusChange, Ticket, TicketId, TicketStatus};
