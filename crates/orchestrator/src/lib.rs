pub mod controller;
pub mod executor;
pub mod notify;
pub mod scheduler;
pub mod store;

pub use controller::{TradeCycleController, TradePaths, MAX_ATTEMPTS};
pub use executor::{amount_out_min, ExecError, SwapExecutor};
pub use notify::{LogNotifier, TelegramNotifier};
pub use scheduler::{resume_action, ResumeAction, Scheduler, FALLBACK_DELAY_MINUTES};
pub use store::SqliteStateStore;
