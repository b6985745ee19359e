pub mod escalation_service;
pub mod notification_service;
pub mod reward_service;
pub mod scheduled_jobs_service;

pub use escalation_service::{EscalationPolicy, EscalationService, SweepReport};
pub use notification_service::{LogNotifier, Notifier, SmtpNotifier};
pub use reward_service::{AwardOutcome, RewardService};
pub use scheduled_jobs_service::ScheduledJobsService;
