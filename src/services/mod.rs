pub mod mailbox;
pub mod quota;
