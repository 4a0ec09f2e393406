pub mod booking;
pub mod feedback;
