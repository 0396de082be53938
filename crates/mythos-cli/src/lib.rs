//! CLI interface for mythos

mod ui;

pub use ui::{
    display_banner, failure_label, format_sources, handle_input_with_history, is_quit, preview,
    print_answer, print_build_report, print_error, print_help, print_sources, print_stats,
    PREVIEW_CHARS, QUIT_TOKENS,
};

// Re-export core types
pub use mythos_core::{Error, Result};
