use maud::{html, Markup};

use crate::session::{SessionStatus, SIGN_IN_PATH};

/// Landing page body: a login prompt when signed out, navigation otherwise.
pub fn home(status: &SessionStatus) -> Markup {
    match status {
        SessionStatus::Unauthenticated => html! {
            main class="home" {
                h2 { "Please Login First" }
                a href=(SIGN_IN_PATH) class="button" { "Login" }
            }
        },
        SessionStatus::Loading | SessionStatus::Authenticated(_) => {
            let name = status
                .session()
                .map(|session| session.display_name())
                .unwrap_or("Unknown");
            html! {
                main class="home" {
                    h1 { "Welcome! " (name) }
                    nav {
                        a href="/repos" class="button" { "See your Repos" }
                        a href="/issues" class="button" { "See your Issues" }
                    }
                }
            }
        }
    }
}
