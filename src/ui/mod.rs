//! Terminal charts for a finished training run: reward and loss per episode.

mod app;
pub mod history_view;

pub use app::{show_history, App};
pub use history_view::HistoryView;
