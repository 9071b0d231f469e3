//! Terminal formatting for command output.

mod server_display;
mod tables;

pub use server_display::{display_server_details, format_status};
pub use tables::{format_optional, print_separator, truncate_string};
