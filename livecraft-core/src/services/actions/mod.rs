pub mod dispatcher;
pub mod template;

pub use dispatcher::{ActionDispatcher, DispatchReport};
pub use template::{render_template, template_vars};
