//! Host UI hooks.

/// Dialogs and indicators owned by the host.
///
/// The core never renders anything on its own. It only asks the host to show
/// or hide the few pieces of UI the session and browse flows need.
pub trait Presenter: Send + Sync {
    /// Show the "connecting" indicator with `message`.
    fn show_connecting(&self, message: &str);

    fn hide_connecting(&self);

    /// Show a progress indicator for a long-running query.
    fn show_progress(&self, heading: &str, message: &str);

    /// Update the progress indicator. `percent` is already clamped to 0..=100.
    fn set_progress(&self, percent: u8);

    fn hide_progress(&self);

    /// Ask a yes/no question. Returns `true` for yes.
    fn confirm(&self, heading: &str, lines: &[String]) -> bool;

    /// Show an acknowledge-only notice.
    fn notify(&self, heading: &str, message: &str);

    /// Prompt for a line of text. `secret` hides the input. `None` when the
    /// user cancelled.
    fn request_text(&self, prompt: &str, secret: bool) -> Option<String>;
}
