pub mod certificate;
pub mod gating;
pub mod grading;
pub mod mail;
pub mod settlement;
pub mod signature;

pub use certificate::{CertificateError, CertificateIssuer};
pub use mail::{EmailAttachment, MailError, Mailer, MemoryMailer, OutgoingEmail, SmtpMailer};
pub use settlement::{SettlementError, SettlementOutcome};
