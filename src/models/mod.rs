pub mod user;
pub mod ipo;
pub mod alert_rule;
pub mod sector;

pub use user::CurrentUser;
pub use ipo::Ipo;
pub use alert_rule::{AlertRule, RuleScope};
pub use sector::Sector;
