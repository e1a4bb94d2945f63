pub mod accounts;
pub mod experience;
pub mod mailer;
pub mod study;
