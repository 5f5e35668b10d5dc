mod layout;
mod widgets;

pub use layout::{card_rect, render};
pub use widgets::{
    render_banner,
    render_canvas,
    render_color_popup,
    render_form,
    render_header,
    render_help_screen,
    render_recovery_screen,
    render_status_bar,
    render_summary_modal,
};
