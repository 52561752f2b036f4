// src/services/mod.rs
pub mod calendar;
pub mod email;
pub mod summary;

pub use calendar::{
    BusinessHours, CalendarError, GoogleCalendar, InterviewScheduler, MeetingDetails,
    UnavailableCalendar,
};
pub use email::{build_mailer, EmailError, LogMailer, Mailer, OutgoingEmail, SmtpMailer};
