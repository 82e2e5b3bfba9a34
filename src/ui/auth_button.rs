use maud::{html, Markup};

use crate::session::{SessionStatus, SIGN_IN_PATH, SIGN_OUT_PATH};

/// Header button whose action follows the session status.
pub fn auth_button(status: &SessionStatus) -> Markup {
    match status {
        SessionStatus::Loading => html! {
            button type="button" class="auth-button" disabled { "Loading" }
        },
        SessionStatus::Authenticated(_) => html! {
            form method="post" action=(SIGN_OUT_PATH) {
                button type="submit" class="auth-button" { "Logout" }
            }
        },
        SessionStatus::Unauthenticated => html! {
            a href=(SIGN_IN_PATH) class="auth-button" { "Login" }
        },
    }
}
