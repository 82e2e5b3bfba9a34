pub mod api;
pub mod auth_button;
pub mod home;
pub mod issue_modal;
pub mod layout;
pub mod pages;
pub mod toast;

#[cfg(test)]
pub mod testing;

pub use api::{ApiError, IssueApi, ProxyClient};
pub use pages::{router, PageState};
