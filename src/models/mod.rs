pub mod feedback;
pub mod reward;
pub mod ticket;
pub mod user;

pub use feedback::{Feedback, FeedbackKind};
pub use reward::{
    default_levels, level_for_points, next_level, validate_level_table, ActionType,
    PointsCatalog, RewardLevel, RewardTransaction,
};
pub use ticket::{
    Comment, StatusCounts, StatusUpdate, Ticket, TicketPatch, TicketPriority, TicketStatus,
};
pub use user::{Role, User};
