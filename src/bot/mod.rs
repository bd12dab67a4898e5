/// Command and message handlers
pub mod handlers;
/// Telegram replies with automatic retry
pub mod resilient;
/// Dispatcher setup and bot entry point
pub mod runner;
