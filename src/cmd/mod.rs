pub mod health;
pub mod lastlogon;
pub mod login;
pub mod mailbox;
pub mod progress;
pub mod tenant;
