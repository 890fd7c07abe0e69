pub mod dispatch;
pub mod transitions;
