pub mod attachments;
pub mod bugs;
pub mod comments;
pub mod transitions;
pub mod watchers;
